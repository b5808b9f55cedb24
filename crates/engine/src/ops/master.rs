use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    BankAccount, EPSILON, EngineError, Party, PartyKind, Product, ResultEngine, UomMapping,
    inventory_transactions,
    parties::{company_bank_accounts, customers, vendor_bank_accounts, vendors},
    products::{self, uoms},
    util::normalize_required_text,
};

use super::{Engine, with_tx};

fn ensure_factor(factor: f64) -> ResultEngine<()> {
    if !factor.is_finite() || factor <= EPSILON {
        return Err(EngineError::Validation(format!(
            "unit factor must be > 0, got {factor}"
        )));
    }
    Ok(())
}

impl Engine {
    /// Creates a product together with its base unit (factor 1).
    pub async fn create_product(&self, name: &str, base_uom: &str) -> ResultEngine<Uuid> {
        let name = normalize_required_text(name, "product name")?;
        let base_uom = normalize_required_text(base_uom, "base unit")?;
        with_tx!(self, |db_tx| {
            let product = Product::new(name);
            products::ActiveModel::from(&product).insert(&db_tx).await?;
            let mapping = UomMapping {
                product_id: product.id,
                uom: base_uom,
                is_base: true,
                factor_to_base: 1.0,
            };
            uoms::ActiveModel::from(&mapping).insert(&db_tx).await?;
            tracing::info!(product_id = %product.id, uom = %mapping.uom, "product created");
            Ok(product.id)
        })
    }

    pub async fn product(&self, product_id: Uuid) -> ResultEngine<Product> {
        with_tx!(self, |db_tx| self.require_product(&db_tx, product_id).await)
    }

    /// Adds an alternate unit: one `uom` equals `factor_to_base` base units.
    pub async fn add_product_uom(
        &self,
        product_id: Uuid,
        uom: &str,
        factor_to_base: f64,
    ) -> ResultEngine<()> {
        let uom = normalize_required_text(uom, "unit")?;
        ensure_factor(factor_to_base)?;
        with_tx!(self, |db_tx| {
            self.require_product(&db_tx, product_id).await?;
            if self.find_mapping(&db_tx, product_id, &uom).await?.is_some() {
                return Err(EngineError::ExistingKey(format!(
                    "unit {uom} of product {product_id}"
                )));
            }
            let mapping = UomMapping {
                product_id,
                uom,
                is_base: false,
                factor_to_base,
            };
            uoms::ActiveModel::from(&mapping).insert(&db_tx).await?;
            Ok(())
        })
    }

    /// Changes the factor of a unit that has never been posted.
    pub async fn set_uom_factor(
        &self,
        product_id: Uuid,
        uom: &str,
        factor_to_base: f64,
    ) -> ResultEngine<()> {
        ensure_factor(factor_to_base)?;
        with_tx!(self, |db_tx| {
            let mapping = self.require_mapping(&db_tx, product_id, uom).await?;
            if mapping.is_base {
                return Err(EngineError::Validation(format!(
                    "base unit {uom} always has factor 1"
                )));
            }
            let postings = inventory_transactions::Entity::find()
                .filter(inventory_transactions::Column::ProductId.eq(product_id.to_string()))
                .filter(inventory_transactions::Column::Uom.eq(mapping.uom.clone()))
                .count(&db_tx)
                .await?;
            if postings > 0 {
                return Err(EngineError::UomLocked(format!(
                    "unit {uom} of product {product_id} has {postings} ledger rows"
                )));
            }
            uoms::ActiveModel {
                product_id: ActiveValue::Set(product_id.to_string()),
                uom: ActiveValue::Set(mapping.uom),
                factor_to_base: ActiveValue::Set(factor_to_base),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            Ok(())
        })
    }

    pub async fn uom_mappings(&self, product_id: Uuid) -> ResultEngine<Vec<UomMapping>> {
        with_tx!(self, |db_tx| {
            self.require_product(&db_tx, product_id).await?;
            self.product_mappings(&db_tx, product_id).await
        })
    }

    pub async fn base_uom(&self, product_id: Uuid) -> ResultEngine<String> {
        with_tx!(self, |db_tx| self.require_base_uom(&db_tx, product_id).await)
    }

    pub async fn factor_to_base(&self, product_id: Uuid, uom: &str) -> ResultEngine<f64> {
        with_tx!(self, |db_tx| {
            let mapping = self.require_mapping(&db_tx, product_id, uom).await?;
            Ok(mapping.factor_to_base)
        })
    }

    pub async fn create_customer(&self, name: &str) -> ResultEngine<Uuid> {
        self.create_party(PartyKind::Customer, name).await
    }

    pub async fn create_vendor(&self, name: &str) -> ResultEngine<Uuid> {
        self.create_party(PartyKind::Vendor, name).await
    }

    pub async fn party(&self, kind: PartyKind, party_id: Uuid) -> ResultEngine<Party> {
        with_tx!(self, |db_tx| self.require_party(&db_tx, kind, party_id).await)
    }

    async fn create_party(&self, kind: PartyKind, name: &str) -> ResultEngine<Uuid> {
        let name = normalize_required_text(name, "name")?;
        with_tx!(self, |db_tx| {
            let party = Party::new(kind, name);
            match kind {
                PartyKind::Customer => {
                    customers::ActiveModel::from(&party).insert(&db_tx).await?;
                }
                PartyKind::Vendor => {
                    vendors::ActiveModel::from(&party).insert(&db_tx).await?;
                }
            }
            tracing::info!(party_id = %party.id, kind = kind.as_str(), "party created");
            Ok(party.id)
        })
    }

    pub async fn create_company_bank_account(
        &self,
        bank_name: &str,
        account_no: &str,
    ) -> ResultEngine<Uuid> {
        let bank_name = normalize_required_text(bank_name, "bank name")?;
        let account_no = normalize_required_text(account_no, "account number")?;
        with_tx!(self, |db_tx| {
            let account = BankAccount::new(None, bank_name, account_no);
            company_bank_accounts::ActiveModel::from(&account)
                .insert(&db_tx)
                .await?;
            Ok(account.id)
        })
    }

    pub async fn create_vendor_bank_account(
        &self,
        vendor_id: Uuid,
        bank_name: &str,
        account_no: &str,
    ) -> ResultEngine<Uuid> {
        let bank_name = normalize_required_text(bank_name, "bank name")?;
        let account_no = normalize_required_text(account_no, "account number")?;
        with_tx!(self, |db_tx| {
            self.require_party(&db_tx, PartyKind::Vendor, vendor_id)
                .await?;
            let account = BankAccount::new(Some(vendor_id), bank_name, account_no);
            vendor_bank_accounts::ActiveModel::from(&account)
                .insert(&db_tx)
                .await?;
            Ok(account.id)
        })
    }

    pub(super) async fn require_product(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
    ) -> ResultEngine<Product> {
        products::Entity::find_by_id(product_id.to_string())
            .one(db)
            .await?
            .map(Product::try_from)
            .transpose()?
            .ok_or_else(|| EngineError::KeyNotFound(format!("product {product_id} not exists")))
    }

    async fn find_mapping(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
        uom: &str,
    ) -> ResultEngine<Option<UomMapping>> {
        uoms::Entity::find_by_id((product_id.to_string(), uom.trim().to_string()))
            .one(db)
            .await?
            .map(UomMapping::try_from)
            .transpose()
    }

    pub(super) async fn require_mapping(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
        uom: &str,
    ) -> ResultEngine<UomMapping> {
        self.find_mapping(db, product_id, uom).await?.ok_or_else(|| {
            EngineError::KeyNotFound(format!("unit {uom} of product {product_id} not exists"))
        })
    }

    pub(super) async fn product_mappings(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
    ) -> ResultEngine<Vec<UomMapping>> {
        uoms::Entity::find()
            .filter(uoms::Column::ProductId.eq(product_id.to_string()))
            .order_by_desc(uoms::Column::IsBase)
            .order_by_asc(uoms::Column::Uom)
            .all(db)
            .await?
            .into_iter()
            .map(UomMapping::try_from)
            .collect()
    }

    pub(super) async fn require_base_uom(
        &self,
        db: &DatabaseTransaction,
        product_id: Uuid,
    ) -> ResultEngine<String> {
        self.product_mappings(db, product_id)
            .await?
            .into_iter()
            .find(|m| m.is_base)
            .map(|m| m.uom)
            .ok_or_else(|| {
                EngineError::KeyNotFound(format!("base unit of product {product_id} not exists"))
            })
    }

    pub(super) async fn require_company_account(
        &self,
        db: &DatabaseTransaction,
        account_id: Uuid,
    ) -> ResultEngine<BankAccount> {
        company_bank_accounts::Entity::find_by_id(account_id.to_string())
            .one(db)
            .await?
            .map(BankAccount::try_from)
            .transpose()?
            .ok_or_else(|| EngineError::KeyNotFound(format!("bank account {account_id} not exists")))
    }

    /// The vendor account must exist and belong to `vendor_id`.
    pub(super) async fn require_vendor_account(
        &self,
        db: &DatabaseTransaction,
        account_id: Uuid,
        vendor_id: Uuid,
    ) -> ResultEngine<BankAccount> {
        let account = vendor_bank_accounts::Entity::find_by_id(account_id.to_string())
            .one(db)
            .await?
            .map(BankAccount::try_from)
            .transpose()?
            .ok_or_else(|| {
                EngineError::KeyNotFound(format!("vendor bank account {account_id} not exists"))
            })?;
        if account.vendor_id != Some(vendor_id) {
            return Err(EngineError::ReferenceMismatch(format!(
                "bank account {account_id} does not belong to vendor {vendor_id}"
            )));
        }
        Ok(account)
    }
}
