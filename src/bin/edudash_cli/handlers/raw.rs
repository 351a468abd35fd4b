#![deny(clippy::all, clippy::pedantic)]

use std::time::Duration;

use edudash::cache::QueryOptions;
use serde_json::json;
use tracing::debug;

use crate::args::{RawCallArgs, WatchArgs};
use crate::client::{CliError, Ctx};
use crate::io::read_json;
use crate::print::{print_json, print_state};

pub fn endpoints(ctx: &Ctx) -> Result<(), CliError> {
    let api = ctx.client.api();
    let listing: Vec<_> = api
        .names()
        .into_iter()
        .filter_map(|name| api.get(name))
        .map(|definition| {
            json!({
                "name": definition.name(),
                "kind": definition.kind().to_string(),
            })
        })
        .collect();
    print_json(&listing)
}

pub async fn query(ctx: &Ctx, call: RawCallArgs) -> Result<(), CliError> {
    let args = read_json(call.args, call.args_file)?;
    let data = ctx.client.query(&call.endpoint, &args).await?;
    print_json(data.as_ref())
}

pub async fn mutate(ctx: &Ctx, call: RawCallArgs) -> Result<(), CliError> {
    let args = read_json(call.args, call.args_file)?;
    let data = ctx.client.mutate(&call.endpoint, &args).await?;
    print_json(&data)
}

pub async fn watch(ctx: &Ctx, watch: WatchArgs) -> Result<(), CliError> {
    if watch.interval_seconds == 0 {
        return Err(CliError::InvalidInput(
            "--interval-seconds must be greater than zero".into(),
        ));
    }
    let args = read_json(watch.call.args, watch.call.args_file)?;
    let options = QueryOptions::polling(Duration::from_secs(watch.interval_seconds));
    let mut subscription = ctx.client.use_query(&watch.call.endpoint, &args, options)?;

    for printed in 1..=watch.count {
        let state = subscription.settled().await;
        print_state(&state)?;
        if printed == watch.count {
            break;
        }
        // Wait for the next poll to start before waiting for it to settle.
        loop {
            if !subscription.changed().await {
                debug!(endpoint = %watch.call.endpoint, "Subscription closed");
                return Ok(());
            }
            if !subscription.state().is_settled() {
                break;
            }
        }
    }
    Ok(())
}
