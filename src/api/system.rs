//! Reference data and platform operations: cities, schools, notifications,
//! queue jobs and the site configuration.

use serde::{Deserialize, Serialize};

use edudash_api_types::system::{
    City, CityInput, NewNotification, Notification, QueueJob, QueueJobStatus, School,
    SchoolInput, SystemConfig,
};
use edudash_api_types::{ListQuery, Page};

use crate::cache::{Api, QueryClient, Tag, TagSource, acknowledged, payload};
use crate::error::{ApiError, RegistryError};
use crate::transport::RequestDescriptor;

use super::tags::{CITY, NOTIFICATION, QUEUE_JOB, SCHOOL, SYSTEM_CONFIG, USER};
use super::{WithId, arg_id, entity_tags, list_tags, page_of};

pub const GET_CITIES: &str = "getCities";
pub const CREATE_CITY: &str = "createCity";
pub const UPDATE_CITY: &str = "updateCity";
pub const DELETE_CITY: &str = "deleteCity";
pub const GET_SCHOOLS: &str = "getSchools";
pub const CREATE_SCHOOL: &str = "createSchool";
pub const UPDATE_SCHOOL: &str = "updateSchool";
pub const DELETE_SCHOOL: &str = "deleteSchool";
pub const GET_NOTIFICATIONS: &str = "getNotifications";
pub const SEND_NOTIFICATION: &str = "sendNotification";
pub const DELETE_NOTIFICATION: &str = "deleteNotification";
pub const GET_QUEUE_JOBS: &str = "getQueueJobs";
pub const RETRY_QUEUE_JOB: &str = "retryQueueJob";
pub const DELETE_QUEUE_JOB: &str = "deleteQueueJob";
pub const GET_SYSTEM_CONFIG: &str = "getSystemConfig";
pub const UPDATE_SYSTEM_CONFIG: &str = "updateSystemConfig";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolListArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueJobListArgs {
    #[serde(flatten)]
    pub query: ListQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<QueueJobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
}

fn register_cities(api: &mut Api) -> Result<(), RegistryError> {
    api.define_query(
        GET_CITIES,
        |(): ()| Ok(RequestDescriptor::get("cities")),
        payload::<Vec<City>>(),
        TagSource::dynamic(|_, result| list_tags(CITY, result)),
    )?
    .define_mutation(
        CREATE_CITY,
        |city: CityInput| RequestDescriptor::post("cities").with_body(&city),
        payload::<City>(),
        TagSource::fixed([Tag::list(CITY)]),
    )?
    .define_mutation(
        UPDATE_CITY,
        |args: WithId<CityInput>| {
            RequestDescriptor::put(format!("cities/{}", args.id)).with_body(&args.body)
        },
        payload::<City>(),
        TagSource::dynamic(|args, _| entity_tags(CITY, args)),
    )?
    .define_mutation(
        DELETE_CITY,
        |id: i64| Ok(RequestDescriptor::delete(format!("cities/{id}"))),
        acknowledged(),
        // Schools reference their city.
        TagSource::dynamic(|args, _| {
            let mut tags = entity_tags(CITY, args);
            tags.push(Tag::list(SCHOOL));
            tags
        }),
    )?;
    Ok(())
}

fn register_schools(api: &mut Api) -> Result<(), RegistryError> {
    api.define_query(
        GET_SCHOOLS,
        |args: SchoolListArgs| RequestDescriptor::get("schools").with_params(&args),
        payload::<Vec<School>>(),
        TagSource::dynamic(|_, result| list_tags(SCHOOL, result)),
    )?
    .define_mutation(
        CREATE_SCHOOL,
        |school: SchoolInput| RequestDescriptor::post("schools").with_body(&school),
        payload::<School>(),
        TagSource::fixed([Tag::list(SCHOOL)]),
    )?
    .define_mutation(
        UPDATE_SCHOOL,
        |args: WithId<SchoolInput>| {
            RequestDescriptor::put(format!("schools/{}", args.id)).with_body(&args.body)
        },
        payload::<School>(),
        TagSource::dynamic(|args, _| entity_tags(SCHOOL, args)),
    )?
    .define_mutation(
        DELETE_SCHOOL,
        |id: i64| Ok(RequestDescriptor::delete(format!("schools/{id}"))),
        acknowledged(),
        TagSource::dynamic(|args, _| entity_tags(SCHOOL, args)),
    )?;
    Ok(())
}

fn register_notifications(api: &mut Api) -> Result<(), RegistryError> {
    api.define_query(
        GET_NOTIFICATIONS,
        |args: ListQuery| RequestDescriptor::get("notifications").with_params(&args),
        page_of::<Notification>("notifications"),
        TagSource::dynamic(|_, result| list_tags(NOTIFICATION, result)),
    )?
    .define_mutation(
        SEND_NOTIFICATION,
        |notification: NewNotification| {
            RequestDescriptor::post("notifications").with_body(&notification)
        },
        payload::<Notification>(),
        TagSource::fixed([Tag::list(NOTIFICATION)]),
    )?
    .define_mutation(
        DELETE_NOTIFICATION,
        |id: i64| Ok(RequestDescriptor::delete(format!("notifications/{id}"))),
        acknowledged(),
        TagSource::dynamic(|args, _| entity_tags(NOTIFICATION, args)),
    )?;
    Ok(())
}

fn register_queue(api: &mut Api) -> Result<(), RegistryError> {
    api.define_query(
        GET_QUEUE_JOBS,
        |args: QueueJobListArgs| RequestDescriptor::get("queue/jobs").with_params(&args),
        page_of::<QueueJob>("jobs"),
        TagSource::dynamic(|_, result| list_tags(QUEUE_JOB, result)),
    )?
    .define_mutation(
        RETRY_QUEUE_JOB,
        |id: String| Ok(RequestDescriptor::post(format!("queue/jobs/{id}/retry"))),
        acknowledged(),
        TagSource::dynamic(|args, _| entity_tags(QUEUE_JOB, args)),
    )?
    .define_mutation(
        DELETE_QUEUE_JOB,
        |id: String| Ok(RequestDescriptor::delete(format!("queue/jobs/{id}"))),
        acknowledged(),
        TagSource::dynamic(|args, _| entity_tags(QUEUE_JOB, args)),
    )?;
    Ok(())
}

fn register_config(api: &mut Api) -> Result<(), RegistryError> {
    api.define_query(
        GET_SYSTEM_CONFIG,
        |(): ()| Ok(RequestDescriptor::get("system/config")),
        payload::<SystemConfig>(),
        TagSource::fixed([Tag::kind(SYSTEM_CONFIG)]),
    )?
    .define_mutation(
        UPDATE_SYSTEM_CONFIG,
        |config: SystemConfig| RequestDescriptor::put("system/config").with_body(&config),
        payload::<SystemConfig>(),
        // Registration and maintenance switches change what user listings show.
        TagSource::fixed([Tag::kind(SYSTEM_CONFIG), Tag::list(USER)]),
    )?;
    Ok(())
}

pub(crate) fn register(api: &mut Api) -> Result<(), RegistryError> {
    register_cities(api)?;
    register_schools(api)?;
    register_notifications(api)?;
    register_queue(api)?;
    register_config(api)
}

pub struct SystemApi<'a> {
    client: &'a QueryClient,
}

impl<'a> SystemApi<'a> {
    pub fn new(client: &'a QueryClient) -> Self {
        Self { client }
    }

    pub async fn cities(&self) -> Result<Vec<City>, ApiError> {
        self.client.query_as(GET_CITIES, &()).await
    }

    pub async fn create_city(&self, city: &CityInput) -> Result<City, ApiError> {
        self.client.mutate_as(CREATE_CITY, city).await
    }

    pub async fn update_city(&self, id: i64, city: CityInput) -> Result<City, ApiError> {
        self.client
            .mutate_as(UPDATE_CITY, &WithId::new(id, city))
            .await
    }

    pub async fn delete_city(&self, id: i64) -> Result<(), ApiError> {
        self.client.mutate(DELETE_CITY, &id).await.map(|_| ())
    }

    pub async fn schools(&self, args: &SchoolListArgs) -> Result<Vec<School>, ApiError> {
        self.client.query_as(GET_SCHOOLS, args).await
    }

    pub async fn create_school(&self, school: &SchoolInput) -> Result<School, ApiError> {
        self.client.mutate_as(CREATE_SCHOOL, school).await
    }

    pub async fn update_school(&self, id: i64, school: SchoolInput) -> Result<School, ApiError> {
        self.client
            .mutate_as(UPDATE_SCHOOL, &WithId::new(id, school))
            .await
    }

    pub async fn delete_school(&self, id: i64) -> Result<(), ApiError> {
        self.client.mutate(DELETE_SCHOOL, &id).await.map(|_| ())
    }

    pub async fn notifications(&self, args: &ListQuery) -> Result<Page<Notification>, ApiError> {
        self.client.query_as(GET_NOTIFICATIONS, args).await
    }

    pub async fn send_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, ApiError> {
        self.client.mutate_as(SEND_NOTIFICATION, notification).await
    }

    pub async fn delete_notification(&self, id: i64) -> Result<(), ApiError> {
        self.client.mutate(DELETE_NOTIFICATION, &id).await.map(|_| ())
    }

    pub async fn queue_jobs(&self, args: &QueueJobListArgs) -> Result<Page<QueueJob>, ApiError> {
        self.client.query_as(GET_QUEUE_JOBS, args).await
    }

    pub async fn retry_job(&self, id: &str) -> Result<(), ApiError> {
        self.client.mutate(RETRY_QUEUE_JOB, id).await.map(|_| ())
    }

    pub async fn delete_job(&self, id: &str) -> Result<(), ApiError> {
        self.client.mutate(DELETE_QUEUE_JOB, id).await.map(|_| ())
    }

    pub async fn config(&self) -> Result<SystemConfig, ApiError> {
        self.client.query_as(GET_SYSTEM_CONFIG, &()).await
    }

    pub async fn update_config(&self, config: &SystemConfig) -> Result<SystemConfig, ApiError> {
        self.client.mutate_as(UPDATE_SYSTEM_CONFIG, config).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::EndpointKind;

    fn api() -> Api {
        let mut api = Api::new();
        register(&mut api).unwrap();
        api
    }

    #[test]
    fn city_list_tags_each_city() {
        let api = api();
        let definition = api.resolve(GET_CITIES, EndpointKind::Query).unwrap();
        let cities = definition
            .transform(&json!(null), Some(json!([{ "id": 1, "name": "Lyon" }])))
            .unwrap();
        assert_eq!(
            definition.tags().resolve(&json!(null), Some(&cities)),
            vec![Tag::list(CITY), Tag::id(CITY, 1)]
        );
    }

    #[test]
    fn deleting_a_city_refreshes_schools() {
        let api = api();
        let definition = api.get(DELETE_CITY).unwrap();
        let tags = definition.tags().resolve(&json!(1), None);
        assert!(tags.contains(&Tag::list(SCHOOL)));
    }

    #[test]
    fn queue_job_ids_are_strings() {
        let api = api();
        let definition = api.resolve(RETRY_QUEUE_JOB, EndpointKind::Mutation).unwrap();
        let request = definition.build_request(&json!("mail:17")).unwrap();
        assert_eq!(request.path, "queue/jobs/mail:17/retry");
        assert_eq!(
            definition.tags().resolve(&json!("mail:17"), None),
            vec![Tag::id(QUEUE_JOB, "mail:17"), Tag::list(QUEUE_JOB)]
        );
    }

    #[test]
    fn config_update_keeps_unknown_keys() {
        let api = api();
        let definition = api.resolve(UPDATE_SYSTEM_CONFIG, EndpointKind::Mutation).unwrap();
        let request = definition
            .build_request(&json!({ "siteName": "Academy", "theme": "dark" }))
            .unwrap();
        let body = request.body.unwrap();
        assert_eq!(body["theme"], "dark");
        assert_eq!(body["siteName"], "Academy");
    }
}
