//! Looks up the acting user in the corporate directory.
//!
//! Credentials are read from `FXIAOKE_APP_ID`, `FXIAOKE_APP_SECRET`,
//! `FXIAOKE_PERMANENT_CODE`, `FXIAOKE_USER_ID` and `FXIAOKE_CORP_ID`.
//!
//! Run with: `cargo run --example get_user`

use fxiaoke::{Client, Credentials, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("fxiaoke=debug,get_user=info")
        .init();

    let credentials = Credentials::from_env();
    let open_user_id = credentials.user_id.clone();
    let client = Client::builder().credentials(credentials).build()?;

    let user = client.get_user_by_open_id(&open_user_id).await?;
    println!("{:#?}", user);

    if let Some(state) = client.token_state().await {
        println!("Token valid for {} seconds", state.expires_in);
    }

    Ok(())
}
