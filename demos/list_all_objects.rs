//! Pages through every record of an object type and reports retries.
//!
//! Usage: `cargo run --example list_all_objects -- [package|custom] <apiName>`
//!
//! Credentials are read from the `FXIAOKE_*` environment variables.

use fxiaoke::endpoint::field;
use fxiaoke::{Client, Credentials, Error, FilterOperator, Namespace, QueryDescriptor};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("fxiaoke=info,list_all_objects=info")
        .init();

    let mut args = std::env::args().skip(1);
    let namespace: Namespace = args.next().unwrap_or_else(|| "package".to_string()).parse()?;
    let api_name = args.next().unwrap_or_else(|| "AccountObj".to_string());

    let client = Client::builder()
        .credentials(Credentials::from_env())
        .notify(Arc::new(|error: &Error, wait: Duration| {
            eprintln!("attempt failed ({error}), retrying in {wait:?}");
        }))
        .build()?;

    let query = QueryDescriptor::default()
        .filter(FilterOperator::Eq, field::LIFE_STATUS, ["normal"])
        .project([field::ID, field::NAME, field::CREATE_TIME]);

    let records = client
        .list_all_objects(namespace, &api_name, query)
        .await?;

    println!("Fetched {} {} records", records.len(), api_name);
    for record in records.iter().take(5) {
        println!("  {}", record);
    }

    Ok(())
}
