#![deny(clippy::all, clippy::pedantic)]

use edudash::api::users::UserListArgs;
use edudash::types::users::NewUser;
use serde_json::json;

use crate::args::UsersCmd;
use crate::client::{CliError, Ctx};
use crate::io::read_body;
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: UsersCmd) -> Result<(), CliError> {
    let users = ctx.client.users();
    match cmd {
        UsersCmd::List {
            page,
            role,
            active,
            school_id,
            city_id,
        } => {
            let args = UserListArgs {
                query: page.into(),
                role: role.map(Into::into),
                is_active: active,
                school_id,
                city_id,
            };
            print_json(&users.list(&args).await?)
        }
        UsersCmd::Get { id } => print_json(&users.get(id).await?),
        UsersCmd::Stats => print_json(&users.stats().await?),
        UsersCmd::Create { input } => {
            let user: NewUser = read_body(input.json, input.file)?;
            print_json(&users.create(&user).await?)
        }
        UsersCmd::Activate { id } => print_json(&users.set_active(id, true).await?),
        UsersCmd::Deactivate { id } => print_json(&users.set_active(id, false).await?),
        UsersCmd::Delete { id } => {
            users.delete(id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}
