//! Read-only reporting endpoints.
//!
//! Every report is keyed by an [`AnalyticsRange`]; each one provides an
//! `Analytics:<section>` tag so writes elsewhere can refresh all reports at
//! once through the bare `Analytics` tag.

use edudash_api_types::analytics::{
    AnalyticsOverview, AnalyticsRange, CoursePerformance, LivestreamAnalytics, TimeSeriesPoint,
};

use crate::cache::{Api, QueryClient, Tag, TagSource, payload};
use crate::error::{ApiError, RegistryError};
use crate::transport::RequestDescriptor;

use super::tags::ANALYTICS;

pub const GET_ANALYTICS_OVERVIEW: &str = "getAnalyticsOverview";
pub const GET_USER_GROWTH: &str = "getUserGrowth";
pub const GET_REVENUE: &str = "getRevenue";
pub const GET_COURSE_PERFORMANCE: &str = "getCoursePerformance";
pub const GET_LIVESTREAM_ANALYTICS: &str = "getLivestreamAnalytics";

fn report(
    path: &'static str,
) -> impl Fn(AnalyticsRange) -> Result<RequestDescriptor, serde_json::Error> + Send + Sync + 'static
{
    move |range| RequestDescriptor::get(format!("analytics/{path}")).with_params(&range)
}

fn section(name: &'static str) -> TagSource {
    TagSource::fixed([Tag::id(ANALYTICS, name)])
}

pub(crate) fn register(api: &mut Api) -> Result<(), RegistryError> {
    api.define_query(
        GET_ANALYTICS_OVERVIEW,
        report("overview"),
        payload::<AnalyticsOverview>(),
        section("overview"),
    )?
    .define_query(
        GET_USER_GROWTH,
        report("user-growth"),
        payload::<Vec<TimeSeriesPoint>>(),
        section("user-growth"),
    )?
    .define_query(
        GET_REVENUE,
        report("revenue"),
        payload::<Vec<TimeSeriesPoint>>(),
        section("revenue"),
    )?
    .define_query(
        GET_COURSE_PERFORMANCE,
        report("courses"),
        payload::<Vec<CoursePerformance>>(),
        section("courses"),
    )?
    .define_query(
        GET_LIVESTREAM_ANALYTICS,
        report("livestreams"),
        payload::<LivestreamAnalytics>(),
        section("livestreams"),
    )?;
    Ok(())
}

pub struct AnalyticsApi<'a> {
    client: &'a QueryClient,
}

impl<'a> AnalyticsApi<'a> {
    pub fn new(client: &'a QueryClient) -> Self {
        Self { client }
    }

    pub async fn overview(&self, range: &AnalyticsRange) -> Result<AnalyticsOverview, ApiError> {
        self.client.query_as(GET_ANALYTICS_OVERVIEW, range).await
    }

    pub async fn user_growth(
        &self,
        range: &AnalyticsRange,
    ) -> Result<Vec<TimeSeriesPoint>, ApiError> {
        self.client.query_as(GET_USER_GROWTH, range).await
    }

    pub async fn revenue(&self, range: &AnalyticsRange) -> Result<Vec<TimeSeriesPoint>, ApiError> {
        self.client.query_as(GET_REVENUE, range).await
    }

    pub async fn course_performance(
        &self,
        range: &AnalyticsRange,
    ) -> Result<Vec<CoursePerformance>, ApiError> {
        self.client.query_as(GET_COURSE_PERFORMANCE, range).await
    }

    pub async fn livestreams(
        &self,
        range: &AnalyticsRange,
    ) -> Result<LivestreamAnalytics, ApiError> {
        self.client.query_as(GET_LIVESTREAM_ANALYTICS, range).await
    }
}
