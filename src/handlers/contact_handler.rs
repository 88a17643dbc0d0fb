//! handlers/contact_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::handlers::{error_response, PaginationQuery};
use crate::models::contact_model::{
    AddListContactsRequest, CreateBroadcastListRequest, CreateContactRequest,
};
use crate::services::contact_service::ContactService;

#[derive(Deserialize)]
pub struct ContactsQuery {
    tenant_id: String,
    page: Option<u64>,
    page_size: Option<u64>,
}

/// POST /api/contacts
pub async fn create_contact_endpoint(
    contact_service: web::Data<ContactService>,
    body: web::Json<CreateContactRequest>,
) -> HttpResponse {
    match contact_service.create_contact(body.into_inner()).await {
        Ok(contact) => HttpResponse::Created().json(contact),
        Err(e) => error_response(&e),
    }
}

/// GET /api/contacts?tenant_id=
pub async fn list_contacts_endpoint(
    contact_service: web::Data<ContactService>,
    query: web::Query<ContactsQuery>,
) -> HttpResponse {
    let query = query.into_inner();
    let pagination = PaginationQuery {
        page: query.page,
        page_size: query.page_size,
    };

    match contact_service
        .list_contacts(&query.tenant_id, pagination.page(), pagination.page_size())
        .await
    {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(&e),
    }
}

/// GET /api/contacts/{id}
pub async fn get_contact_endpoint(
    contact_service: web::Data<ContactService>,
    path: web::Path<String>,
) -> HttpResponse {
    match contact_service.get_contact(&path.into_inner()).await {
        Ok(contact) => HttpResponse::Ok().json(contact),
        Err(e) => error_response(&e),
    }
}

/// POST /api/broadcast-lists
pub async fn create_list_endpoint(
    contact_service: web::Data<ContactService>,
    body: web::Json<CreateBroadcastListRequest>,
) -> HttpResponse {
    match contact_service.create_list(body.into_inner()).await {
        Ok(list) => HttpResponse::Created().json(list),
        Err(e) => error_response(&e),
    }
}

/// POST /api/broadcast-lists/{id}/contacts
pub async fn add_list_contacts_endpoint(
    contact_service: web::Data<ContactService>,
    path: web::Path<String>,
    body: web::Json<AddListContactsRequest>,
) -> HttpResponse {
    let list_id = path.into_inner();
    let req = body.into_inner();

    match contact_service
        .add_contacts_to_list(&list_id, &req.contact_ids)
        .await
    {
        Ok(added) => HttpResponse::Ok().json(json!({
            "success": true,
            "list_id": list_id,
            "added": added
        })),
        Err(e) => error_response(&e),
    }
}

/// GET /api/broadcast-lists/{id}/contacts
pub async fn list_members_endpoint(
    contact_service: web::Data<ContactService>,
    path: web::Path<String>,
) -> HttpResponse {
    match contact_service.list_members(&path.into_inner()).await {
        Ok(members) => HttpResponse::Ok().json(members),
        Err(e) => error_response(&e),
    }
}
