//! PostgreSQL implementation of CustomerRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{corrupt_column, map_db_error};
use crate::domain::foundation::{CustomerId, DomainError, Email, Timestamp};
use crate::domain::sync::Customer;
use crate::ports::CustomerRepository;

const SELECT_CUSTOMER: &str = r#"
    SELECT id, provisioning_customer_id, payments_customer_id, email, name,
           created_at, updated_at, deleted_at
    FROM customers
"#;

pub struct PostgresCustomerRepository {
    pool: PgPool,
}

impl PostgresCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: &str, value: &str) -> Result<Option<Customer>, DomainError> {
        let sql = format!("{} WHERE {} = $1 AND deleted_at IS NULL", SELECT_CUSTOMER, filter);
        let row: Option<CustomerRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "fetch customer"))?;
        row.map(Customer::try_from).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    provisioning_customer_id: String,
    payments_customer_id: Option<String>,
    email: String,
    name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = DomainError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::new(&row.email).map_err(|_| corrupt_column("email", &row.email))?;
        Ok(Customer {
            id: CustomerId::from_uuid(row.id),
            provisioning_customer_id: row.provisioning_customer_id,
            payments_customer_id: row.payments_customer_id,
            email,
            name: row.name,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            deleted_at: row.deleted_at.map(Timestamp::from_datetime),
        })
    }
}

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    async fn create(&self, customer: &Customer) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO customers (
                id, provisioning_customer_id, payments_customer_id, email, name,
                created_at, updated_at, deleted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.provisioning_customer_id)
        .bind(&customer.payments_customer_id)
        .bind(customer.email.as_str())
        .bind(&customer.name)
        .bind(customer.created_at.as_datetime())
        .bind(customer.updated_at.as_datetime())
        .bind(customer.deleted_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "create customer"))?;

        Ok(())
    }

    async fn update(&self, customer: &Customer) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE customers SET
                payments_customer_id = $2,
                email = $3,
                name = $4,
                updated_at = $5,
                deleted_at = $6
            WHERE id = $1
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.payments_customer_id)
        .bind(customer.email.as_str())
        .bind(&customer.name)
        .bind(customer.updated_at.as_datetime())
        .bind(customer.deleted_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "update customer"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Customer", customer.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, DomainError> {
        let sql = format!("{} WHERE id = $1 AND deleted_at IS NULL", SELECT_CUSTOMER);
        let row: Option<CustomerRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "fetch customer"))?;
        row.map(Customer::try_from).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, DomainError> {
        self.find_one("email", email.as_str()).await
    }

    async fn find_by_provisioning_id(
        &self,
        provisioning_customer_id: &str,
    ) -> Result<Option<Customer>, DomainError> {
        self.find_one("provisioning_customer_id", provisioning_customer_id)
            .await
    }

    async fn find_by_payments_id(
        &self,
        payments_customer_id: &str,
    ) -> Result<Option<Customer>, DomainError> {
        self.find_one("payments_customer_id", payments_customer_id).await
    }

    async fn soft_delete(&self, id: &CustomerId, at: Timestamp) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE customers SET deleted_at = $2, updated_at = $2
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "delete customer"))?;

        Ok(result.rows_affected() > 0)
    }
}
