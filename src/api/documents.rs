//! Course material (document) endpoints.

use serde::{Deserialize, Serialize};

use edudash_api_types::documents::{Document, DocumentUpdate, NewDocument};
use edudash_api_types::{ListQuery, Page};

use crate::cache::{Api, QueryClient, Tag, TagSource, acknowledged, payload};
use crate::error::{ApiError, RegistryError};
use crate::transport::RequestDescriptor;

use super::tags::{ANALYTICS, DOCUMENT};
use super::{WithId, arg_id, entity_tags, list_tags, page_of};

pub const GET_DOCUMENTS: &str = "getDocuments";
pub const GET_DOCUMENT: &str = "getDocument";
pub const CREATE_DOCUMENT: &str = "createDocument";
pub const UPDATE_DOCUMENT: &str = "updateDocument";
pub const DELETE_DOCUMENT: &str = "deleteDocument";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListArgs {
    #[serde(flatten)]
    pub query: ListQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

pub(crate) fn register(api: &mut Api) -> Result<(), RegistryError> {
    api.define_query(
        GET_DOCUMENTS,
        |args: DocumentListArgs| RequestDescriptor::get("documents").with_params(&args),
        page_of::<Document>("documents"),
        TagSource::dynamic(|_, result| list_tags(DOCUMENT, result)),
    )?
    .define_query(
        GET_DOCUMENT,
        |id: i64| Ok(RequestDescriptor::get(format!("documents/{id}"))),
        payload::<Document>(),
        TagSource::dynamic(|args, _| vec![Tag::id(DOCUMENT, arg_id(args))]),
    )?
    .define_mutation(
        CREATE_DOCUMENT,
        |document: NewDocument| RequestDescriptor::post("documents").with_body(&document),
        payload::<Document>(),
        TagSource::fixed([Tag::list(DOCUMENT), Tag::kind(ANALYTICS)]),
    )?
    .define_mutation(
        UPDATE_DOCUMENT,
        |args: WithId<DocumentUpdate>| {
            RequestDescriptor::put(format!("documents/{}", args.id)).with_body(&args.body)
        },
        payload::<Document>(),
        TagSource::dynamic(|args, _| entity_tags(DOCUMENT, args)),
    )?
    .define_mutation(
        DELETE_DOCUMENT,
        |id: i64| Ok(RequestDescriptor::delete(format!("documents/{id}"))),
        acknowledged(),
        TagSource::dynamic(|args, _| {
            let mut tags = entity_tags(DOCUMENT, args);
            tags.push(Tag::kind(ANALYTICS));
            tags
        }),
    )?;
    Ok(())
}

pub struct DocumentsApi<'a> {
    client: &'a QueryClient,
}

impl<'a> DocumentsApi<'a> {
    pub fn new(client: &'a QueryClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, args: &DocumentListArgs) -> Result<Page<Document>, ApiError> {
        self.client.query_as(GET_DOCUMENTS, args).await
    }

    pub async fn get(&self, id: i64) -> Result<Document, ApiError> {
        self.client.query_as(GET_DOCUMENT, &id).await
    }

    pub async fn create(&self, document: &NewDocument) -> Result<Document, ApiError> {
        self.client.mutate_as(CREATE_DOCUMENT, document).await
    }

    pub async fn update(&self, id: i64, changes: DocumentUpdate) -> Result<Document, ApiError> {
        self.client
            .mutate_as(UPDATE_DOCUMENT, &WithId::new(id, changes))
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.mutate(DELETE_DOCUMENT, &id).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::EndpointKind;

    #[test]
    fn delete_reaches_detail_and_list() {
        let mut api = Api::new();
        register(&mut api).unwrap();

        let definition = api.resolve(DELETE_DOCUMENT, EndpointKind::Mutation).unwrap();
        let tags = definition.tags().resolve(&json!(42), Some(&json!(null)));
        assert_eq!(
            tags,
            vec![
                Tag::id(DOCUMENT, 42),
                Tag::list(DOCUMENT),
                Tag::kind(ANALYTICS)
            ]
        );

        let detail = api.get(GET_DOCUMENT).unwrap();
        assert_eq!(
            detail.tags().resolve(&json!(42), None),
            vec![Tag::id(DOCUMENT, 42)]
        );
    }

    #[test]
    fn list_filters_use_backend_names() {
        let args = DocumentListArgs {
            course_id: Some(7),
            ..DocumentListArgs::default()
        };
        let request = RequestDescriptor::get("documents")
            .with_params(&args)
            .unwrap();
        assert_eq!(request.query, vec![("courseId".to_string(), "7".to_string())]);
    }
}
