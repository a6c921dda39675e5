//! Tiberius-backed driver
//!
//! Wraps a `tiberius::Client` over a tokio TCP stream and adapts its typed
//! rows into the JSON rows the rest of the crate works with.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Number, Value};
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::driver::{DriverConfig, Row, SqlConnection, SqlDriver};
use crate::error::{AdapterError, Result};
use crate::sql::value::SqlParam;

/// Production driver speaking TDS through tiberius
#[derive(Debug, Clone, Copy, Default)]
pub struct TiberiusDriver;

#[async_trait]
impl SqlDriver for TiberiusDriver {
    async fn open(&self, config: &DriverConfig) -> Result<Box<dyn SqlConnection>> {
        let tds_config = build_config(config)?;
        let connect = async {
            let tcp = TcpStream::connect(tds_config.get_addr())
                .await
                .map_err(|e| AdapterError::connect(format!("tcp connect failed: {}", e)))?;
            tcp.set_nodelay(true)
                .map_err(|e| AdapterError::connect(format!("tcp setup failed: {}", e)))?;
            Client::connect(tds_config, tcp.compat_write())
                .await
                .map_err(|e| AdapterError::connect(format!("tds handshake failed: {}", e)))
        };
        let client = tokio::time::timeout(config.connection_timeout, connect)
            .await
            .map_err(|_| AdapterError::connect("connection attempt timed out"))??;
        debug!(host = %config.host, port = config.port, "opened sql server connection");
        Ok(Box::new(TiberiusConnection {
            client,
            request_timeout: config.request_timeout,
        }))
    }
}

fn build_config(config: &DriverConfig) -> Result<Config> {
    // A raw connection URL wins over the discrete fields.
    if let Some(url) = &config.url {
        return Config::from_ado_string(url)
            .map_err(|e| AdapterError::connect(format!("invalid connection url: {}", e)));
    }

    let mut tds_config = Config::new();
    tds_config.host(&config.host);
    tds_config.port(config.port);
    if let Some(database) = &config.database {
        tds_config.database(database);
    }
    if let Some(user) = &config.user {
        tds_config.authentication(AuthMethod::sql_server(
            user,
            config.password.as_deref().unwrap_or_default(),
        ));
    }
    if config.encrypt {
        tds_config.encryption(EncryptionLevel::Required);
    } else {
        tds_config.encryption(EncryptionLevel::NotSupported);
    }
    tds_config.trust_cert();
    Ok(tds_config)
}

struct TiberiusConnection {
    client: Client<Compat<TcpStream>>,
    request_timeout: std::time::Duration,
}

#[async_trait]
impl SqlConnection for TiberiusConnection {
    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>> {
        let mut query = Query::new(sql.to_owned());
        for param in params {
            bind_param(&mut query, param);
        }

        let run = async {
            let stream = query
                .query(&mut self.client)
                .await
                .map_err(|e| AdapterError::query(e.to_string()))?;
            stream
                .into_results()
                .await
                .map_err(|e| AdapterError::query(e.to_string()))
        };
        let results = tokio::time::timeout(self.request_timeout, run)
            .await
            .map_err(|_| AdapterError::query("request timed out"))??;

        Ok(results
            .into_iter()
            .flatten()
            .map(row_to_json)
            .collect())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.client
            .close()
            .await
            .map_err(|e| AdapterError::connect(format!("close failed: {}", e)))
    }
}

fn bind_param<'a>(query: &mut Query<'a>, param: &'a SqlParam) {
    match param {
        SqlParam::Null => query.bind(Option::<&str>::None),
        SqlParam::Bool(b) => query.bind(*b),
        SqlParam::Int(i) => query.bind(*i),
        SqlParam::Float(f) => query.bind(*f),
        SqlParam::String(s) => query.bind(s.as_str()),
        SqlParam::DateTime(dt) => query.bind(*dt),
    }
}

fn row_to_json(row: tiberius::Row) -> Row {
    let mut object = Row::new();
    for (column, data) in row.cells() {
        object.insert(column.name().to_string(), cell_to_json(data));
    }
    object
}

fn cell_to_json(data: &ColumnData<'static>) -> Value {
    match data {
        ColumnData::U8(v) => v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null),
        ColumnData::I16(v) => v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null),
        ColumnData::I32(v) => v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null),
        ColumnData::I64(v) => v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null),
        ColumnData::F32(v) => v.map(|f| float_value(f as f64)).unwrap_or(Value::Null),
        ColumnData::F64(v) => v.map(float_value).unwrap_or(Value::Null),
        ColumnData::Bit(v) => v.map(Value::Bool).unwrap_or(Value::Null),
        ColumnData::String(v) => v
            .as_ref()
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Guid(v) => v
            .map(|g| Value::String(g.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Numeric(v) => v
            .map(|n| float_value(n.value() as f64 / 10f64.powi(n.scale() as i32)))
            .unwrap_or(Value::Null),
        ColumnData::Binary(v) => v
            .as_ref()
            .map(|bytes| {
                Value::String(bytes.iter().map(|b| format!("{:02x}", b)).collect())
            })
            .unwrap_or(Value::Null),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|xml| Value::String(xml.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Date(_) => NaiveDate::from_sql(data)
            .ok()
            .flatten()
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Time(_) => NaiveTime::from_sql(data)
            .ok()
            .flatten()
            .map(|t| Value::String(t.format("%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)
                .ok()
                .flatten()
                .map(|dt| {
                    Value::String(
                        DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339(),
                    )
                })
                .unwrap_or(Value::Null)
        }
        ColumnData::DateTimeOffset(_) => DateTime::<Utc>::from_sql(data)
            .ok()
            .flatten()
            .map(|dt| Value::String(dt.to_rfc3339()))
            .unwrap_or(Value::Null),
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}
