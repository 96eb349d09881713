use crate::{
    auth::{hash_password, verify_password, AuthError, AuthService, Role},
    entities::{
        commerce::{customer, Customer},
        user, User, UserModel,
    },
    errors::ServiceError,
    repositories::{repo, Page, PageRequest, SortOrder},
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

pub static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{3,80}$").expect("username pattern is valid"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum UserSort {
    #[default]
    Username,
    Email,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterUserInput {
    #[validate(regex(
        path = "USERNAME_RE",
        message = "Username must be 3-80 letters, digits or underscores"
    ))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    /// Display name for the shopper's customer record, defaults to the username
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    pub role: Option<Role>,
    pub customer_id: Option<Uuid>,
}

/// User accounts: registration, login and administration
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, auth: Arc<AuthService>) -> Self {
        Self { db, auth }
    }

    /// Registers a shopper together with a fresh customer of their own.
    /// Self-registered users always get the `user` role and can never pick an
    /// existing customer; linking one is a super admin update.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterUserInput) -> Result<UserModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let customer = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.unwrap_or_else(|| input.username.clone())),
            email: Set(input.email.clone()),
            phone: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };
        let customer = repo::<Customer, _>(&txn).insert(customer).await?;

        let user = insert_user(
            &txn,
            input.username,
            input.email,
            &input.password,
            Role::User,
            Some(customer.id),
        )
        .await?;
        txn.commit().await?;

        info!(user_id = %user.id, customer_id = %customer.id, "Shopper registered");
        Ok(user)
    }

    /// Checks credentials and issues a session token.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn login(&self, input: LoginInput) -> Result<String, ServiceError> {
        input.validate()?;

        let user = repo::<User, _>(&*self.db)
            .live()
            .filter(user::Column::Username.eq(input.username.as_str()))
            .one(&*self.db)
            .await?;

        let user = match user {
            Some(user) if verify_password(&input.password, &user.password_hash) => user,
            _ => {
                warn!("failed login attempt");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let token = self.auth.issue_token(&user.id.to_string(), user.role)?;
        info!(user_id = %user.id, "User logged in");
        Ok(token)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserModel, ServiceError> {
        repo::<User, _>(&*self.db).get(id).await
    }

    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        page: PageRequest,
        sort_by: UserSort,
        sort_order: SortOrder,
    ) -> Result<Page<UserModel>, ServiceError> {
        let column = match sort_by {
            UserSort::Username => user::Column::Username,
            UserSort::Email => user::Column::Email,
        };
        repo::<User, _>(&*self.db)
            .list(page, Some((column, sort_order)))
            .await
    }

    #[instrument(skip(self, input))]
    pub async fn update_user(
        &self,
        id: Uuid,
        input: UpdateUserInput,
    ) -> Result<UserModel, ServiceError> {
        input.validate()?;
        let users = repo::<User, _>(&*self.db);
        let existing = users.get(id).await?;
        if let Some(customer_id) = input.customer_id {
            repo::<Customer, _>(&*self.db).get(customer_id).await?;
            let linked_elsewhere = User::find()
                .filter(user::Column::CustomerId.eq(customer_id))
                .filter(user::Column::Id.ne(id))
                .count(&*self.db)
                .await?;
            if linked_elsewhere > 0 {
                return Err(ServiceError::Conflict(format!(
                    "Customer {} is already linked to another user",
                    customer_id
                )));
            }
        }

        let mut active: user::ActiveModel = existing.into();
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        if let Some(password) = input.password {
            active.password_hash = Set(hash_password(&password)?);
        }
        if let Some(role) = input.role {
            active.role = Set(role);
        }
        if let Some(customer_id) = input.customer_id {
            active.customer_id = Set(Some(customer_id));
        }
        active.updated_at = Set(Utc::now());

        let updated = users.update(active).await?;
        info!(user_id = %id, role = %updated.role, "User updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<(), ServiceError> {
        repo::<User, _>(&*self.db).soft_delete(id).await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Customer linked to the user, if any
    pub async fn linked_customer(&self, user_id: Uuid) -> Result<Option<Uuid>, ServiceError> {
        let user = repo::<User, _>(&*self.db)
            .find_active(user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthenticated("User no longer exists".to_string()))?;
        Ok(user.customer_id)
    }

    /// Customer whose cart the user operates on
    pub async fn customer_for_user(&self, user_id: Uuid) -> Result<Uuid, ServiceError> {
        self.linked_customer(user_id).await?.ok_or_else(|| {
            ServiceError::Forbidden("No customer is linked to this user".to_string())
        })
    }

    /// Creates the configured super admin unless a user with that name exists.
    /// Returns whether a user was created.
    pub async fn bootstrap_admin(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<bool, ServiceError> {
        let existing = repo::<User, _>(&*self.db)
            .live()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let email = email
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}@localhost", username));
        insert_user(
            &*self.db,
            username.to_string(),
            email,
            password,
            Role::SuperAdmin,
            None,
        )
        .await?;

        info!(username, "Bootstrap super admin created");
        Ok(true)
    }
}

async fn insert_user<C: ConnectionTrait>(
    conn: &C,
    username: String,
    email: String,
    password: &str,
    role: Role,
    customer_id: Option<Uuid>,
) -> Result<UserModel, ServiceError> {
    let now = Utc::now();
    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        email: Set(email),
        password_hash: Set(hash_password(password)?),
        role: Set(role),
        customer_id: Set(customer_id),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };

    let user = repo::<User, _>(conn).insert(user).await?;
    info!(user_id = %user.id, role = %user.role, "User created");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("bob", true)]
    #[test_case("alice_01", true)]
    #[test_case("ab", false ; "too short")]
    #[test_case("has space", false)]
    #[test_case("dash-name", false)]
    fn username_pattern(username: &str, valid: bool) {
        let input = RegisterUserInput {
            username: username.to_string(),
            email: "someone@example.com".to_string(),
            password: "long-enough".to_string(),
            name: None,
        };
        assert_eq!(input.validate().is_ok(), valid);
    }

    #[test]
    fn username_longer_than_80_is_rejected() {
        assert!(USERNAME_RE.is_match(&"a".repeat(80)));
        assert!(!USERNAME_RE.is_match(&"a".repeat(81)));
    }

    #[test]
    fn short_password_and_bad_email_are_rejected() {
        let input = RegisterUserInput {
            username: "carol".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            name: None,
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn customer_name_may_be_omitted_but_not_blank() {
        let mut input = RegisterUserInput {
            username: "dana".to_string(),
            email: "dana@example.com".to_string(),
            password: "long-enough".to_string(),
            name: None,
        };
        assert!(input.validate().is_ok());
        input.name = Some(String::new());
        assert!(input.validate().unwrap_err().field_errors().contains_key("name"));
    }
}
