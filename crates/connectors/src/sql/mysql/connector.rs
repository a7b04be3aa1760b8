use crate::sql::{
    base::{
        error::{ConnectorError, DbError},
        executor::{QueryExecutor, RowStream},
        params::QueryParams,
    },
    mysql::{params::MySqlParamStore, row::decode_row},
};
use async_trait::async_trait;
use futures_util::StreamExt;
use mysql_async::{Conn, Opts, OptsBuilder, Row, prelude::Queryable};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Connection parameters for the source database.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionConfig {
    pub fn opts(&self) -> Opts {
        OptsBuilder::default()
            .ip_or_hostname(self.host.clone())
            .tcp_port(self.port)
            .user(Some(self.user.clone()))
            .pass(Some(self.password.clone()))
            .db_name(Some(self.database.clone()))
            .into()
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// A single MySQL connection, used by one stream extraction at a time.
pub struct MySqlConnector {
    conn: Conn,
}

impl MySqlConnector {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, ConnectorError> {
        let conn = Conn::new(config.opts()).await?;
        info!(
            "Connected to MySQL at {}:{}/{}",
            config.host, config.port, config.database
        );
        Ok(Self { conn })
    }

    pub async fn ping(&mut self) -> Result<(), DbError> {
        self.conn.ping().await?;
        Ok(())
    }

    pub async fn disconnect(self) -> Result<(), DbError> {
        self.conn.disconnect().await?;
        Ok(())
    }
}

#[async_trait]
impl QueryExecutor for MySqlConnector {
    async fn execute<'a>(
        &'a mut self,
        sql: &'a str,
        params: QueryParams,
    ) -> Result<RowStream<'a>, DbError> {
        let params = MySqlParamStore::from_query_params(&params)?.params();

        // Rows are pulled from the server as the stream is polled.
        let rows = self.conn.exec_stream::<Row, _, _>(sql, params).await?;

        Ok(rows
            .map(|row| row.map_err(DbError::from).and_then(|row| decode_row(&row)))
            .boxed())
    }
}
