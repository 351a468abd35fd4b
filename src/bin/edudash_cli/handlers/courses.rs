#![deny(clippy::all, clippy::pedantic)]

use edudash::api::courses::CourseListArgs;
use edudash::types::courses::{CourseUpdate, NewCourse};
use serde_json::json;

use crate::args::CoursesCmd;
use crate::client::{CliError, Ctx};
use crate::io::read_body;
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: CoursesCmd) -> Result<(), CliError> {
    let courses = ctx.client.courses();
    match cmd {
        CoursesCmd::List {
            page,
            status,
            teacher_id,
            category,
        } => {
            let args = CourseListArgs {
                query: page.into(),
                status: status.map(Into::into),
                teacher_id,
                category,
            };
            print_json(&courses.list(&args).await?)
        }
        CoursesCmd::Get { id } => print_json(&courses.get(id).await?),
        CoursesCmd::Stats => print_json(&courses.stats().await?),
        CoursesCmd::Create { input } => {
            let course: NewCourse = read_body(input.json, input.file)?;
            print_json(&courses.create(&course).await?)
        }
        CoursesCmd::Update { id, input } => {
            let changes: CourseUpdate = read_body(input.json, input.file)?;
            print_json(&courses.update(id, changes).await?)
        }
        CoursesCmd::SetStatus { id, status } => {
            print_json(&courses.set_status(id, status.into()).await?)
        }
        CoursesCmd::Delete { id } => {
            courses.delete(id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}
