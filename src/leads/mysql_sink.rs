//! MySQL lead sink (`bot_leads` table)

use futures::future::BoxFuture;
use futures::FutureExt;
use mysql_async::{params, prelude::*, Pool};

use super::{LeadRecord, LeadSink};
use crate::error::Result;

/// Connection settings; every field falls back to a `MYSQL_*` variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for MySqlSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            database: "fitness_funnel".to_string(),
            user: "fitness_funnel".to_string(),
            password: String::new(),
        }
    }
}

impl MySqlSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("MYSQL_HOST").unwrap_or(defaults.host),
            port: std::env::var("MYSQL_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database: std::env::var("MYSQL_DATABASE").unwrap_or(defaults.database),
            user: std::env::var("MYSQL_USER").unwrap_or(defaults.user),
            password: std::env::var("MYSQL_PASSWORD").unwrap_or_default(),
        }
    }

    fn opts(&self) -> mysql_async::OptsBuilder {
        mysql_async::OptsBuilder::default()
            .ip_or_hostname(self.host.clone())
            .tcp_port(self.port)
            .db_name(Some(self.database.clone()))
            .user(Some(self.user.clone()))
            .pass(Some(self.password.clone()))
    }
}

#[derive(Clone)]
pub struct MySqlLeadSink {
    pool: Pool,
    bot_name: String,
}

impl MySqlLeadSink {
    /// Connects and creates the table if it is missing.
    pub async fn connect(settings: &MySqlSettings, bot_name: &str) -> Result<Self> {
        let sink = Self {
            pool: Pool::new(settings.opts()),
            bot_name: bot_name.to_string(),
        };
        sink.ensure_table().await?;
        Ok(sink)
    }

    async fn ensure_table(&self) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop(
            r#"
            CREATE TABLE IF NOT EXISTS bot_leads (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                bot_name VARCHAR(64) NOT NULL,
                user_id BIGINT NOT NULL,
                username VARCHAR(255) NULL,
                display_name VARCHAR(255) NULL,
                height_cm DOUBLE NULL,
                weight_kg DOUBLE NULL,
                calories INT NULL,
                tariff VARCHAR(32) NOT NULL,
                email VARCHAR(255) NULL,
                created_at DATETIME NOT NULL,
                KEY idx_lead_user (user_id),
                KEY idx_lead_bot (bot_name)
            )
        "#,
            (),
        )
        .await?;
        Ok(())
    }

    async fn insert(&self, record: &LeadRecord) -> Result<()> {
        let query = r#"
            INSERT INTO bot_leads
            (bot_name, user_id, username, display_name, height_cm, weight_kg, calories, tariff, email, created_at)
            VALUES (:bot_name, :user_id, :username, :display_name, :height_cm, :weight_kg, :calories, :tariff, :email, :created_at)
        "#;

        let params = params! {
            "bot_name" => self.bot_name.clone(),
            "user_id" => record.user_id.0,
            "username" => record.username.clone(),
            "display_name" => record.display_name.clone(),
            "height_cm" => record.height_cm,
            "weight_kg" => record.weight_kg,
            "calories" => record.calories,
            "tariff" => record.tariff.code(),
            "email" => record.email.clone(),
            "created_at" => record.timestamp.naive_utc(),
        };

        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop(query, params).await?;
        Ok(())
    }
}

impl LeadSink for MySqlLeadSink {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn append<'a>(&'a self, record: &'a LeadRecord) -> BoxFuture<'a, Result<()>> {
        self.insert(record).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_defaults() {
        let settings = MySqlSettings::default();
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 3306);
        assert!(settings.password.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires a running MySQL server
    async fn connect_creates_table() {
        let sink = MySqlLeadSink::connect(&MySqlSettings::from_env(), "test_bot").await;
        assert!(sink.is_ok());
    }
}
