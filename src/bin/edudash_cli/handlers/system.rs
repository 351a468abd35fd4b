#![deny(clippy::all, clippy::pedantic)]

use edudash::api::system::{QueueJobListArgs, SchoolListArgs};
use serde_json::json;

use crate::args::SystemCmd;
use crate::client::{CliError, Ctx};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: SystemCmd) -> Result<(), CliError> {
    let system = ctx.client.system();
    match cmd {
        SystemCmd::Cities => print_json(&system.cities().await?),
        SystemCmd::Schools { city_id, search } => {
            let args = SchoolListArgs { city_id, search };
            print_json(&system.schools(&args).await?)
        }
        SystemCmd::Notifications { page } => {
            print_json(&system.notifications(&page.into()).await?)
        }
        SystemCmd::Jobs {
            page,
            status,
            queue,
        } => {
            let args = QueueJobListArgs {
                query: page.into(),
                status: status.map(Into::into),
                queue,
            };
            print_json(&system.queue_jobs(&args).await?)
        }
        SystemCmd::RetryJob { id } => {
            system.retry_job(&id).await?;
            print_json(&json!({ "retried": id }))
        }
        SystemCmd::DeleteJob { id } => {
            system.delete_job(&id).await?;
            print_json(&json!({ "deleted": id }))
        }
        SystemCmd::Config => print_json(&system.config().await?),
    }
}
