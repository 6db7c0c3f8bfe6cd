//! Submission flows the view layer drives.
//!
//! Registration uploads every image sequentially before the single contract
//! write; a partial upload failure aborts the flow with the already-pinned
//! images left behind (accepted at-least-once semantics, no compensating
//! unpin). Purchase performs the courtesy ownership check the contract
//! enforces for real.

use crate::{MarketGateway, units};
use mf_api_types::{MarketError, Product};
use mf_pinning::{ImageFile, ImagePinner};
use mf_reporter::{Notice, OperationKind, Phase, StatusSink, observe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Contract-imposed ceiling on images per product.
pub const MAX_IMAGES: usize = 10;

pub const MSG_CONNECT_TO_REGISTER: &str = "Connect a wallet to register a product.";
pub const MSG_CONNECT_TO_PURCHASE: &str = "Connect a wallet to purchase a product.";
pub const MSG_OWN_PRODUCT: &str = "You cannot purchase your own product.";
pub const MSG_UPLOADING: &str = "Uploading images to IPFS...";
pub const MSG_UPLOAD_FAILED: &str = "Failed to upload images.";
pub const MSG_REGISTER_PENDING: &str = "Processing product registration transaction...";
pub const MSG_REGISTER_FAILED: &str = "Failed to register product.";
pub const MSG_PURCHASE_PENDING: &str = "Processing purchase transaction...";
pub const MSG_PURCHASE_FAILED: &str = "Failed to purchase product.";

/// Registration form state, including the per-form in-flight guard.
#[derive(Debug, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub price: String,
    pub description: String,
    pub images: Vec<ImageFile>,
    in_flight: Arc<AtomicBool>,
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a submission for this form is currently outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Acquire the in-flight guard, or `None` when a submission is already
    /// outstanding. Released on drop, whatever the outcome.
    fn begin(&self) -> Option<SubmitGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SubmitGuard(self.in_flight.clone()))
    }

    /// Reset every field after a confirmed registration.
    pub fn clear(&mut self) {
        self.name.clear();
        self.price.clear();
        self.description.clear();
        self.images.clear();
    }
}

struct SubmitGuard(Arc<AtomicBool>);

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn validate(form: &RegistrationForm) -> Result<(), MarketError> {
    if form.name.trim().is_empty() {
        return Err(MarketError::InvalidInput(
            "product name is required".to_owned(),
        ));
    }
    if form.description.trim().is_empty() {
        return Err(MarketError::InvalidInput(
            "product description is required".to_owned(),
        ));
    }
    if form.images.is_empty() {
        return Err(MarketError::InvalidInput(
            "at least one product image is required".to_owned(),
        ));
    }
    if form.images.len() > MAX_IMAGES {
        return Err(MarketError::InvalidInput(format!(
            "at most {MAX_IMAGES} images can be attached"
        )));
    }
    if units::to_wei(&form.price)?.is_zero() {
        return Err(MarketError::InvalidInput(format!(
            "price must be positive: {}",
            form.price
        )));
    }
    Ok(())
}

/// Submit one registration: validate, pin every image sequentially, then
/// register on-chain and clear the form once confirmed.
///
/// A second submission while one is outstanding is dropped silently
/// (disabled-button semantics). The contract write is never attempted once
/// any upload has failed.
pub async fn submit_registration(
    gateway: &MarketGateway,
    pinner: &dyn ImagePinner,
    sink: &dyn StatusSink,
    form: &mut RegistrationForm,
) -> Result<(), MarketError> {
    let Some(_guard) = form.begin() else {
        tracing::debug!("registration already in flight; submission dropped");
        return Ok(());
    };

    if !gateway.session().is_connected().await {
        sink.notify(Notice::Failure, MSG_CONNECT_TO_REGISTER);
        return Err(MarketError::NoSigner);
    }
    if let Err(err) = validate(form) {
        sink.notify(Notice::Failure, &err.to_string());
        return Err(err);
    }

    sink.phase(OperationKind::Upload, Phase::Pending, MSG_UPLOADING);
    let mut image_urls = Vec::with_capacity(form.images.len());
    for file in &form.images {
        match pinner.pin_image(file).await {
            Ok(url) => image_urls.push(url),
            Err(err) => {
                let failure = MarketError::Upload {
                    reason: err.to_string(),
                };
                sink.phase(
                    OperationKind::Upload,
                    Phase::Failure,
                    &failure.reason().unwrap_or_else(|| MSG_UPLOAD_FAILED.to_owned()),
                );
                return Err(failure);
            }
        }
    }
    sink.phase(
        OperationKind::Upload,
        Phase::Success,
        &format!("Uploaded {} images.", image_urls.len()),
    );

    sink.phase(OperationKind::Register, Phase::Pending, MSG_REGISTER_PENDING);
    let result = gateway
        .register_product(&form.name, &form.price, image_urls, &form.description)
        .await;
    match result {
        Ok(_receipt) => {
            let name = form.name.clone();
            form.clear();
            sink.phase(
                OperationKind::Register,
                Phase::Success,
                &format!("Product '{name}' registered."),
            );
            Ok(())
        }
        Err(err) => {
            sink.phase(
                OperationKind::Register,
                Phase::Failure,
                &err.reason().unwrap_or_else(|| MSG_REGISTER_FAILED.to_owned()),
            );
            Err(err)
        }
    }
}

/// Submit one purchase for a listed product.
///
/// The connectivity and ownership checks here are view-layer courtesies;
/// the gateway relays owner-initiated purchases unchanged and the contract
/// makes the final call.
pub async fn submit_purchase(
    gateway: &MarketGateway,
    sink: &dyn StatusSink,
    product: &Product,
) -> Result<(), MarketError> {
    let Some(account) = gateway.session().account().await else {
        sink.notify(Notice::Failure, MSG_CONNECT_TO_PURCHASE);
        return Err(MarketError::NoSigner);
    };
    if product.is_listed_by(&account) {
        sink.notify(Notice::Failure, MSG_OWN_PRODUCT);
        return Err(MarketError::InvalidInput(MSG_OWN_PRODUCT.to_owned()));
    }

    observe(
        sink,
        OperationKind::Purchase,
        MSG_PURCHASE_PENDING,
        MSG_PURCHASE_FAILED,
        gateway.purchase_product(product.id, &product.price),
        |_receipt| format!("Purchased '{}'.", product.name),
        |err: &MarketError| err.reason(),
    )
    .await
    .map(|_| ())
}
