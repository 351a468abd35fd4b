//! Command-line surface for `edudash-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use edudash::config::ConfigOverrides;
use edudash::types::analytics::TimeRange;
use edudash::types::courses::CourseStatus;
use edudash::types::livestreams::LivestreamStatus;
use edudash::types::system::QueueJobStatus;
use edudash::types::users::UserRole;

#[derive(Parser, Debug)]
#[command(
    name = "edudash-cli",
    version,
    about = "E-learning admin dashboard API client",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigOverrides,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every registered endpoint
    Endpoints,
    /// Run any query endpoint by name
    Query(RawCallArgs),
    /// Run any mutation endpoint by name
    Mutate(RawCallArgs),
    /// Poll a query endpoint and print each settled result
    Watch(WatchArgs),
    /// Course management
    Courses(CoursesArgs),
    /// Course documents
    Documents(DocumentsArgs),
    /// Livestream scheduling and lifecycle
    Livestreams(LivestreamsArgs),
    /// User accounts
    Users(UsersArgs),
    /// Reporting
    Analytics(AnalyticsArgs),
    /// Cities, schools, notifications, queue jobs and system configuration
    System(SystemArgs),
}

#[derive(Args, Debug)]
pub struct RawCallArgs {
    /// Endpoint name, e.g. `getCourses`
    pub endpoint: String,
    /// Inline JSON arguments
    #[arg(long)]
    pub args: Option<String>,
    /// Read JSON arguments from a file (`-` for stdin)
    #[arg(long)]
    pub args_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub call: RawCallArgs,
    /// Polling interval
    #[arg(long, default_value_t = 5)]
    pub interval_seconds: u64,
    /// Stop after this many results
    #[arg(long, default_value_t = 1)]
    pub count: u32,
}

#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 10)]
    pub limit: u32,
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// Inline JSON body
    #[arg(long)]
    pub json: Option<String>,
    /// Read the JSON body from a file (`-` for stdin)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct CoursesArgs {
    #[command(subcommand)]
    pub action: CoursesCmd,
}

#[derive(Subcommand, Debug)]
pub enum CoursesCmd {
    /// List courses
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        status: Option<CourseStatusArg>,
        #[arg(long)]
        teacher_id: Option<i64>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Get a course by id
    Get { id: i64 },
    /// Aggregate course counters
    Stats,
    /// Create a course from JSON
    Create {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Apply a partial update from JSON
    Update {
        id: i64,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Change a course's publication status
    SetStatus { id: i64, status: CourseStatusArg },
    /// Delete a course
    Delete { id: i64 },
}

#[derive(Parser, Debug)]
pub struct DocumentsArgs {
    #[command(subcommand)]
    pub action: DocumentsCmd,
}

#[derive(Subcommand, Debug)]
pub enum DocumentsCmd {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        course_id: Option<i64>,
        #[arg(long)]
        file_type: Option<String>,
    },
    Get {
        id: i64,
    },
    Create {
        #[command(flatten)]
        input: InputArgs,
    },
    Delete {
        id: i64,
    },
}

#[derive(Parser, Debug)]
pub struct LivestreamsArgs {
    #[command(subcommand)]
    pub action: LivestreamsCmd,
}

#[derive(Subcommand, Debug)]
pub enum LivestreamsCmd {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        status: Option<LivestreamStatusArg>,
        #[arg(long)]
        course_id: Option<i64>,
    },
    Get {
        id: i64,
    },
    Create {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Go live
    Start {
        id: i64,
    },
    /// Finish a live session
    End {
        id: i64,
    },
    Delete {
        id: i64,
    },
}

#[derive(Parser, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub action: UsersCmd,
}

#[derive(Subcommand, Debug)]
pub enum UsersCmd {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        role: Option<UserRoleArg>,
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        school_id: Option<i64>,
        #[arg(long)]
        city_id: Option<i64>,
    },
    Get {
        id: i64,
    },
    Stats,
    Create {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Re-enable a suspended account
    Activate {
        id: i64,
    },
    /// Suspend an account
    Deactivate {
        id: i64,
    },
    Delete {
        id: i64,
    },
}

#[derive(Parser, Debug)]
pub struct AnalyticsArgs {
    #[command(subcommand)]
    pub action: AnalyticsCmd,
}

#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// Reporting window
    #[arg(long, default_value_t = TimeRangeArg::Month)]
    pub range: TimeRangeArg,
    /// First day (YYYY-MM-DD); requires --to
    #[arg(long, requires = "to")]
    pub from: Option<String>,
    /// Last day (YYYY-MM-DD); requires --from
    #[arg(long, requires = "from")]
    pub to: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum AnalyticsCmd {
    Overview(RangeArgs),
    UserGrowth(RangeArgs),
    Revenue(RangeArgs),
    Courses(RangeArgs),
    Livestreams(RangeArgs),
}

#[derive(Parser, Debug)]
pub struct SystemArgs {
    #[command(subcommand)]
    pub action: SystemCmd,
}

#[derive(Subcommand, Debug)]
pub enum SystemCmd {
    /// List cities
    Cities,
    /// List schools
    Schools {
        #[arg(long)]
        city_id: Option<i64>,
        #[arg(long)]
        search: Option<String>,
    },
    /// List notifications
    Notifications {
        #[command(flatten)]
        page: PageArgs,
    },
    /// List background queue jobs
    Jobs {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        status: Option<QueueJobStatusArg>,
        #[arg(long)]
        queue: Option<String>,
    },
    /// Retry a failed queue job
    RetryJob { id: String },
    /// Remove a queue job
    DeleteJob { id: String },
    /// Show system configuration
    Config,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CourseStatusArg {
    Draft,
    Published,
    Archived,
}

impl From<CourseStatusArg> for CourseStatus {
    fn from(value: CourseStatusArg) -> Self {
        match value {
            CourseStatusArg::Draft => CourseStatus::Draft,
            CourseStatusArg::Published => CourseStatus::Published,
            CourseStatusArg::Archived => CourseStatus::Archived,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LivestreamStatusArg {
    Scheduled,
    Live,
    Ended,
    Cancelled,
}

impl From<LivestreamStatusArg> for LivestreamStatus {
    fn from(value: LivestreamStatusArg) -> Self {
        match value {
            LivestreamStatusArg::Scheduled => LivestreamStatus::Scheduled,
            LivestreamStatusArg::Live => LivestreamStatus::Live,
            LivestreamStatusArg::Ended => LivestreamStatus::Ended,
            LivestreamStatusArg::Cancelled => LivestreamStatus::Cancelled,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum UserRoleArg {
    Admin,
    Teacher,
    Student,
}

impl From<UserRoleArg> for UserRole {
    fn from(value: UserRoleArg) -> Self {
        match value {
            UserRoleArg::Admin => UserRole::Admin,
            UserRoleArg::Teacher => UserRole::Teacher,
            UserRoleArg::Student => UserRole::Student,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum QueueJobStatusArg {
    Waiting,
    Active,
    Completed,
    Failed,
    Delayed,
}

impl From<QueueJobStatusArg> for QueueJobStatus {
    fn from(value: QueueJobStatusArg) -> Self {
        match value {
            QueueJobStatusArg::Waiting => QueueJobStatus::Waiting,
            QueueJobStatusArg::Active => QueueJobStatus::Active,
            QueueJobStatusArg::Completed => QueueJobStatus::Completed,
            QueueJobStatusArg::Failed => QueueJobStatus::Failed,
            QueueJobStatusArg::Delayed => QueueJobStatus::Delayed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TimeRangeArg {
    #[value(name = "7d")]
    Week,
    #[value(name = "30d")]
    Month,
    #[value(name = "90d")]
    Quarter,
    #[value(name = "1y")]
    Year,
    All,
}

impl From<TimeRangeArg> for TimeRange {
    fn from(value: TimeRangeArg) -> Self {
        match value {
            TimeRangeArg::Week => TimeRange::Week,
            TimeRangeArg::Month => TimeRange::Month,
            TimeRangeArg::Quarter => TimeRange::Quarter,
            TimeRangeArg::Year => TimeRange::Year,
            TimeRangeArg::All => TimeRange::All,
        }
    }
}

impl fmt::Display for TimeRangeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(TimeRange::from(*self).as_str())
    }
}
