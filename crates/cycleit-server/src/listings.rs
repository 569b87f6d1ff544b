//! Listing directory, detail, authoring and interest.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use cycleit_shared::constants::MAX_LISTING_IMAGES;
use cycleit_shared::listing::{image_object_key, ListingDraft, ListingFilter};
use cycleit_shared::protocol::{
    ExpressInterestRequest, InterestStatus, ListingCreated, SetListingActiveRequest,
};
use cycleit_shared::{Bucket, Condition};
use cycleit_store::{Category, Interest, Listing, Message, Product, ProductImage, StoreError};

use crate::api::AppState;
use crate::auth::CurrentUser;
use crate::error::ServerError;
use crate::multipart::{FormData, UploadedFile};

// ─── Directory ───

/// Query string of `GET /listings`. `all` or an empty value means no filter.
#[derive(Debug, Default, Deserialize)]
pub struct BrowseQuery {
    pub category_id: Option<String>,
    pub condition: Option<String>,
    pub search: Option<String>,
}

impl TryFrom<BrowseQuery> for ListingFilter {
    type Error = ServerError;

    fn try_from(q: BrowseQuery) -> Result<Self, Self::Error> {
        fn selected(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
        }

        let category_id = selected(q.category_id)
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|_| ServerError::BadRequest("invalid category_id".into()))?;
        let condition = selected(q.condition)
            .map(|s| s.parse::<Condition>())
            .transpose()?;

        Ok(ListingFilter {
            category_id,
            condition,
            search: selected(q.search),
        })
    }
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ServerError> {
    Ok(Json(state.db()?.list_categories()?))
}

pub async fn browse(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<Vec<Listing>>, ServerError> {
    let filter = ListingFilter::try_from(query)?;
    Ok(Json(state.db()?.search_listings(&filter)?))
}

/// Inactive listings are only visible to their owner.
pub async fn listing_detail(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Listing>, ServerError> {
    let listing = state.db()?.get_listing(id)?;
    let is_owner = viewer.is_some_and(|v| v.user_id == listing.product.owner_id);
    if !listing.product.is_active && !is_owner {
        return Err(ServerError::NotFound("listing not found".into()));
    }
    Ok(Json(listing))
}

pub async fn my_listings(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Listing>>, ServerError> {
    Ok(Json(state.db()?.listings_for_owner(user.user_id)?))
}

// ─── Authoring ───

/// `POST /listings`: text fields plus up to five `images` file parts.
///
/// The product row is written first. Images are then stored one at a time;
/// one that fails is logged and skipped, and its index is reported in
/// `failed_uploads`. Stored images keep their original index as display
/// order.
pub async fn create_listing(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ListingCreated>), ServerError> {
    let mut form = FormData::read(multipart).await?;
    let draft = draft_from_form(&form)?.validate()?;
    let mut files = form.take_files("images");

    let product = draft.into_product(user.user_id, Utc::now());
    {
        let db = state.db()?;
        match db.get_category(product.category_id) {
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                return Err(ServerError::BadRequest("unknown category".into()))
            }
            Err(e) => return Err(e.into()),
        }
        db.insert_product(&product)?;
    }
    info!(product = %product.id, owner = %user.user_id, images = files.len(), "listing created");

    if files.len() > MAX_LISTING_IMAGES {
        warn!(
            product = %product.id,
            submitted = files.len(),
            max = MAX_LISTING_IMAGES,
            "too many images, extra ones dropped"
        );
        files.truncate(MAX_LISTING_IMAGES);
    }

    let (uploaded, failed_uploads) = store_images(&state, &product, files).await;
    let listing = state.db()?.get_listing(product.id)?;

    Ok((
        StatusCode::CREATED,
        Json(ListingCreated {
            listing,
            uploaded,
            failed_uploads,
        }),
    ))
}

fn draft_from_form(form: &FormData) -> Result<ListingDraft, ServerError> {
    let category_id = Uuid::parse_str(form.required("category_id")?.trim())
        .map_err(|_| ServerError::BadRequest("invalid category_id".into()))?;
    let condition = form.required("condition")?.trim().parse::<Condition>()?;

    Ok(ListingDraft {
        title: form.text("title").unwrap_or_default().to_string(),
        description: form.text("description").unwrap_or_default().to_string(),
        category_id,
        condition,
        desired_exchange: form.text("desired_exchange").map(str::to_string),
        location: form.text("location").map(str::to_string),
    })
}

async fn store_images(
    state: &AppState,
    product: &Product,
    files: Vec<UploadedFile>,
) -> (Vec<ProductImage>, Vec<usize>) {
    let mut uploaded = Vec::new();
    let mut failed = Vec::new();

    for (index, file) in files.into_iter().enumerate() {
        match store_image(state, product, index, &file).await {
            Ok(image) => uploaded.push(image),
            Err(e) => {
                warn!(
                    product = %product.id,
                    index,
                    file = %file.file_name,
                    error = %e,
                    "image upload failed, skipping"
                );
                failed.push(index);
            }
        }
    }

    (uploaded, failed)
}

async fn store_image(
    state: &AppState,
    product: &Product,
    index: usize,
    file: &UploadedFile,
) -> Result<ProductImage, ServerError> {
    if !file.looks_like_image() {
        return Err(ServerError::BadRequest(format!(
            "not an image: {}",
            file.content_type.as_deref().unwrap_or_default()
        )));
    }

    let key = image_object_key(product.owner_id, product.id, index, &file.file_name, Utc::now());
    state
        .blob_store
        .put(Bucket::ProductImages, &key, &file.data, false)
        .await?;

    let image = ProductImage {
        id: Uuid::new_v4(),
        product_id: product.id,
        image_url: state.blob_store.public_url(Bucket::ProductImages, &key),
        display_order: index as i32,
    };

    let recorded = state
        .db()
        .and_then(|db| db.insert_product_image(&image, &key).map_err(ServerError::from));
    if let Err(e) = recorded {
        // no row points at the object, so it must not outlive this call
        if let Err(cleanup) = state.blob_store.delete(Bucket::ProductImages, &key).await {
            warn!(key = %key, error = %cleanup, "failed to remove unrecorded image");
        }
        return Err(e);
    }

    Ok(image)
}

// ─── Owner actions ───

fn owned_product(state: &AppState, id: Uuid, user: &CurrentUser) -> Result<Product, ServerError> {
    let product = state.db()?.get_product(id)?;
    if product.owner_id != user.user_id {
        return Err(ServerError::Forbidden("not the owner of this listing".into()));
    }
    Ok(product)
}

pub async fn set_active(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SetListingActiveRequest>,
) -> Result<Json<Listing>, ServerError> {
    owned_product(&state, id, &user)?;
    let listing = {
        let db = state.db()?;
        db.set_product_active(id, req.is_active)?;
        db.get_listing(id)?
    };
    info!(product = %id, active = req.is_active, "listing activation changed");
    Ok(Json(listing))
}

/// Hard delete. Stored images are removed best-effort afterwards.
pub async fn delete_listing(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    owned_product(&state, id, &user)?;
    let keys = {
        let db = state.db()?;
        let keys = db.image_keys_for_product(id)?;
        db.delete_product(id)?;
        keys
    };

    for key in &keys {
        if let Err(e) = state.blob_store.delete(Bucket::ProductImages, key).await {
            warn!(product = %id, key = %key, error = %e, "could not remove listing image");
        }
    }

    info!(product = %id, images = keys.len(), "listing deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ─── Interest ───

pub async fn interest_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<InterestStatus>, ServerError> {
    let interested = state.db()?.has_interest(id, user.user_id)?;
    Ok(Json(InterestStatus { interested }))
}

/// Record interest in a listing. A non-empty message is also sent to the
/// owner as a direct message about the product.
pub async fn express_interest(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ExpressInterestRequest>,
) -> Result<(StatusCode, Json<Interest>), ServerError> {
    let now = Utc::now();
    let message = req
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    let interest = {
        let db = state.db()?;
        let product = db.get_product(id)?;
        if product.owner_id == user.user_id {
            return Err(ServerError::BadRequest(
                "cannot express interest in your own listing".into(),
            ));
        }
        if !product.is_active {
            return Err(ServerError::NotFound("listing not found".into()));
        }

        let interest = Interest {
            id: Uuid::new_v4(),
            product_id: id,
            user_id: user.user_id,
            message: message.clone(),
            created_at: now,
        };
        db.insert_interest(&interest)?;

        if let Some(content) = message {
            db.insert_message(&Message {
                id: Uuid::new_v4(),
                sender_id: user.user_id,
                recipient_id: product.owner_id,
                product_id: Some(id),
                content,
                created_at: now,
                is_read: false,
            })?;
        }
        interest
    };

    info!(product = %id, user = %user.user_id, "interest recorded");
    Ok((StatusCode::CREATED, Json(interest)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browse_query_all_means_unfiltered() {
        let filter = ListingFilter::try_from(BrowseQuery {
            category_id: Some("all".into()),
            condition: Some("all".into()),
            search: Some("   ".into()),
        })
        .unwrap();
        assert_eq!(filter, ListingFilter::default());
    }

    #[test]
    fn browse_query_parses_values() {
        let id = Uuid::new_v4();
        let filter = ListingFilter::try_from(BrowseQuery {
            category_id: Some(id.to_string()),
            condition: Some("like-new".into()),
            search: Some(" bike ".into()),
        })
        .unwrap();
        assert_eq!(filter.category_id, Some(id));
        assert_eq!(filter.condition, Some(Condition::LikeNew));
        assert_eq!(filter.search.as_deref(), Some("bike"));
    }

    #[test]
    fn browse_query_rejects_garbage() {
        assert!(ListingFilter::try_from(BrowseQuery {
            category_id: Some("nope".into()),
            ..Default::default()
        })
        .is_err());
        assert!(ListingFilter::try_from(BrowseQuery {
            condition: Some("broken".into()),
            ..Default::default()
        })
        .is_err());
    }
}
