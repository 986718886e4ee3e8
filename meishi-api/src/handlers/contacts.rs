use actix_web::{web, HttpResponse, Result as ActixResult};
use shared_types::ContactsResponse;
use std::sync::Arc;

use crate::database::contacts as contacts_db;
use crate::database::Database;

pub async fn list_contacts(db: web::Data<Arc<Database>>) -> ActixResult<HttpResponse> {
    let contacts = contacts_db::list_contacts(db.async_connection.clone())
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

    Ok(HttpResponse::Ok().json(ContactsResponse { contacts }))
}
