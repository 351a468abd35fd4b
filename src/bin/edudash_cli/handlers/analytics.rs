#![deny(clippy::all, clippy::pedantic)]

use edudash::types::analytics::{AnalyticsRange, parse_date};

use crate::args::{AnalyticsCmd, RangeArgs};
use crate::client::{CliError, Ctx};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: AnalyticsCmd) -> Result<(), CliError> {
    let analytics = ctx.client.analytics();
    match cmd {
        AnalyticsCmd::Overview(range) => print_json(&analytics.overview(&to_range(range)?).await?),
        AnalyticsCmd::UserGrowth(range) => {
            print_json(&analytics.user_growth(&to_range(range)?).await?)
        }
        AnalyticsCmd::Revenue(range) => print_json(&analytics.revenue(&to_range(range)?).await?),
        AnalyticsCmd::Courses(range) => {
            print_json(&analytics.course_performance(&to_range(range)?).await?)
        }
        AnalyticsCmd::Livestreams(range) => {
            print_json(&analytics.livestreams(&to_range(range)?).await?)
        }
    }
}

pub fn to_range(args: RangeArgs) -> Result<AnalyticsRange, CliError> {
    let range = AnalyticsRange::last(args.range.into());
    match (args.from, args.to) {
        (Some(from), Some(to)) => {
            let invalid = |e: edudash::types::analytics::RangeError| {
                CliError::InvalidInput(e.to_string())
            };
            let start = parse_date(&from).map_err(invalid)?;
            let end = parse_date(&to).map_err(invalid)?;
            range.between(start, end).map_err(invalid)
        }
        (None, None) => Ok(range),
        _ => Err(CliError::InvalidInput(
            "--from and --to must be given together".into(),
        )),
    }
}
