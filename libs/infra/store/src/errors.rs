// [libs/infra/store/src/errors.rs]
/*! Categorical error taxonomy for the relational store adapter. */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Network or link failure reaching the backing libSQL database.
    #[error("[STORE_CONN_FAULT]: connection failed -> {0}")]
    Connection(String),

    /// Config rows empty or malformed (e.g. an unset `DATABASE_URL`).
    #[error("[STORE_CONFIG_FAULT]: configuration invalid -> {0}")]
    Configuration(String),

    /// Syntax or execution error returned by the libSQL engine.
    #[error("[STORE_QUERY_FAULT]: query rejected -> {0}")]
    Query(#[from] libsql::Error),

    /// Row shape did not map onto the expected domain type.
    #[error("[STORE_MAPPING_FAULT]: mapping violation -> {0}")]
    Mapping(String),

    /// The requested probe, rule or record does not exist.
    #[error("[STORE_NOT_FOUND]: {0} not found")]
    NotFound(&'static str),
}
