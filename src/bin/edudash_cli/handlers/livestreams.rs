#![deny(clippy::all, clippy::pedantic)]

use edudash::api::livestreams::LivestreamListArgs;
use edudash::types::livestreams::NewLivestream;
use serde_json::json;

use crate::args::LivestreamsCmd;
use crate::client::{CliError, Ctx};
use crate::io::read_body;
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: LivestreamsCmd) -> Result<(), CliError> {
    let livestreams = ctx.client.livestreams();
    match cmd {
        LivestreamsCmd::List {
            page,
            status,
            course_id,
        } => {
            let args = LivestreamListArgs {
                query: page.into(),
                status: status.map(Into::into),
                course_id,
            };
            print_json(&livestreams.list(&args).await?)
        }
        LivestreamsCmd::Get { id } => print_json(&livestreams.get(id).await?),
        LivestreamsCmd::Create { input } => {
            let stream: NewLivestream = read_body(input.json, input.file)?;
            print_json(&livestreams.create(&stream).await?)
        }
        LivestreamsCmd::Start { id } => print_json(&livestreams.start(id).await?),
        LivestreamsCmd::End { id } => print_json(&livestreams.end(id).await?),
        LivestreamsCmd::Delete { id } => {
            livestreams.delete(id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}
