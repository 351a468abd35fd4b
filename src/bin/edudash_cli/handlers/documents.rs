#![deny(clippy::all, clippy::pedantic)]

use edudash::api::documents::DocumentListArgs;
use edudash::types::documents::NewDocument;
use serde_json::json;

use crate::args::DocumentsCmd;
use crate::client::{CliError, Ctx};
use crate::io::read_body;
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: DocumentsCmd) -> Result<(), CliError> {
    let documents = ctx.client.documents();
    match cmd {
        DocumentsCmd::List {
            page,
            course_id,
            file_type,
        } => {
            let args = DocumentListArgs {
                query: page.into(),
                course_id,
                file_type,
            };
            print_json(&documents.list(&args).await?)
        }
        DocumentsCmd::Get { id } => print_json(&documents.get(id).await?),
        DocumentsCmd::Create { input } => {
            let document: NewDocument = read_body(input.json, input.file)?;
            print_json(&documents.create(&document).await?)
        }
        DocumentsCmd::Delete { id } => {
            documents.delete(id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}
