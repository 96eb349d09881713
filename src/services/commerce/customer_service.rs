use crate::{
    auth::hash_password,
    entities::commerce::{
        customer, customer_account, Customer, CustomerAccount, CustomerAccountModel,
        CustomerModel,
    },
    errors::ServiceError,
    repositories::{repo, Page, PageRequest, SortOrder},
    services::users::USERNAME_RE,
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CustomerSort {
    #[default]
    Name,
    Email,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AccountSort {
    #[default]
    Username,
    CreatedAt,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCustomerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCustomerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCustomerAccountInput {
    #[validate(regex(
        path = "USERNAME_RE",
        message = "Username must be 3-80 letters, digits or underscores"
    ))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub customer_id: Uuid,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCustomerAccountInput {
    #[validate(regex(
        path = "USERNAME_RE",
        message = "Username must be 3-80 letters, digits or underscores"
    ))]
    pub username: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// Customer service for managing customers and their accounts
#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
}

impl CustomerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create_customer(
        &self,
        input: CreateCustomerInput,
    ) -> Result<CustomerModel, ServiceError> {
        input.validate()?;

        let now = Utc::now();
        let customer = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let customer = repo::<Customer, _>(&*self.db).insert(customer).await?;
        info!("Created customer: {}", customer.id);
        Ok(customer)
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<CustomerModel, ServiceError> {
        repo::<Customer, _>(&*self.db).get(id).await
    }

    pub async fn list_customers(
        &self,
        page: PageRequest,
        sort_by: CustomerSort,
        sort_order: SortOrder,
    ) -> Result<Page<CustomerModel>, ServiceError> {
        let column = match sort_by {
            CustomerSort::Name => customer::Column::Name,
            CustomerSort::Email => customer::Column::Email,
            CustomerSort::CreatedAt => customer::Column::CreatedAt,
        };
        repo::<Customer, _>(&*self.db)
            .list(page, Some((column, sort_order)))
            .await
    }

    #[instrument(skip(self, input))]
    pub async fn update_customer(
        &self,
        id: Uuid,
        input: UpdateCustomerInput,
    ) -> Result<CustomerModel, ServiceError> {
        input.validate()?;
        let customers = repo::<Customer, _>(&*self.db);
        let existing = customers.get(id).await?;

        let mut active: customer::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        active.updated_at = Set(Utc::now());

        customers.update(active).await
    }

    /// Soft-deletes a customer; their orders stay valid.
    #[instrument(skip(self))]
    pub async fn delete_customer(&self, id: Uuid) -> Result<(), ServiceError> {
        repo::<Customer, _>(&*self.db).soft_delete(id).await?;
        info!("Deleted customer: {}", id);
        Ok(())
    }

    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_account(
        &self,
        input: CreateCustomerAccountInput,
    ) -> Result<CustomerAccountModel, ServiceError> {
        input.validate()?;
        self.get_customer(input.customer_id).await?;

        let now = Utc::now();
        let account = customer_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(input.username),
            password_hash: Set(hash_password(&input.password)?),
            customer_id: Set(input.customer_id),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let account = repo::<CustomerAccount, _>(&*self.db)
            .insert(account)
            .await?;
        info!("Created customer account: {}", account.id);
        Ok(account)
    }

    pub async fn get_account(&self, id: Uuid) -> Result<CustomerAccountModel, ServiceError> {
        repo::<CustomerAccount, _>(&*self.db).get(id).await
    }

    pub async fn list_accounts(
        &self,
        page: PageRequest,
        sort_by: AccountSort,
        sort_order: SortOrder,
    ) -> Result<Page<CustomerAccountModel>, ServiceError> {
        let column = match sort_by {
            AccountSort::Username => customer_account::Column::Username,
            AccountSort::CreatedAt => customer_account::Column::CreatedAt,
        };
        repo::<CustomerAccount, _>(&*self.db)
            .list(page, Some((column, sort_order)))
            .await
    }

    #[instrument(skip(self, input))]
    pub async fn update_account(
        &self,
        id: Uuid,
        input: UpdateCustomerAccountInput,
    ) -> Result<CustomerAccountModel, ServiceError> {
        input.validate()?;
        let accounts = repo::<CustomerAccount, _>(&*self.db);
        let existing = accounts.get(id).await?;

        let mut active: customer_account::ActiveModel = existing.into();
        if let Some(username) = input.username {
            active.username = Set(username);
        }
        if let Some(password) = input.password {
            active.password_hash = Set(hash_password(&password)?);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        accounts.update(active).await
    }

    #[instrument(skip(self))]
    pub async fn delete_account(&self, id: Uuid) -> Result<(), ServiceError> {
        repo::<CustomerAccount, _>(&*self.db).soft_delete(id).await?;
        info!("Deleted customer account: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_input_validation() {
        let valid = CreateCustomerInput {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: Some("5550001111".into()),
        };
        assert!(valid.validate().is_ok());

        let invalid = CreateCustomerInput {
            name: "".into(),
            email: "ada".into(),
            phone: Some("12".into()),
        };
        let errors = invalid.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 3);
    }

    #[test]
    fn account_defaults_to_active() {
        let input: CreateCustomerAccountInput = serde_json::from_value(serde_json::json!({
            "username": "ada_l",
            "password": "analytical",
            "customer_id": Uuid::new_v4(),
        }))
        .unwrap();
        assert!(input.is_active);
        assert!(input.validate().is_ok());
    }
}
