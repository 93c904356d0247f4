//! Order Models

use std::{fmt, str::FromStr};

use jiff::Timestamp;

use crate::{
    auth::UserUuid,
    domain::{
        ParseEnumError,
        orders::errors::FieldError,
        products::models::{ProductUuid, Size},
    },
    uuids::TypedUuid,
};

/// Order UUID
pub type OrderUuid = TypedUuid<Order>;

/// Longest allowed free-text order notes.
pub const MAX_NOTES_LEN: usize = 500;

/// Longest allowed status-history note.
pub const MAX_STATUS_NOTE_LEN: usize = 200;

/// How the buyer pays. Only the tag is recorded; there is no gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cod,
    BankTransfer,
    JazzCash,
    EasyPaisa,
    Card,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cod => "COD",
            Self::BankTransfer => "BankTransfer",
            Self::JazzCash => "JazzCash",
            Self::EasyPaisa => "EasyPaisa",
            Self::Card => "Card",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "COD" => Ok(Self::Cod),
            "BankTransfer" => Ok(Self::BankTransfer),
            "JazzCash" => Ok(Self::JazzCash),
            "EasyPaisa" => Ok(Self::EasyPaisa),
            "Card" => Ok(Self::Card),
            _ => Err(ParseEnumError::new("payment method", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Failed => "Failed",
            Self::Refunded => "Refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            _ => Err(ParseEnumError::new("payment status", value)),
        }
    }
}

/// Order lifecycle states. `Pending → Confirmed → Processing → Shipped →
/// Delivered` is the forward path; `Cancelled` and `Returned` absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Returned => "Returned",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            "Returned" => Ok(Self::Returned),
            _ => Err(ParseEnumError::new("order status", value)),
        }
    }
}

/// Delivery address captured on the order as a value object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingAddress {
    pub full_name: String,
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: Option<String>,
    pub phone: String,
}

impl ShippingAddress {
    /// Field-level validation: everything but the postal code is required,
    /// and the phone must look like a Pakistani number.
    pub(crate) fn collect_field_errors(&self, errors: &mut Vec<FieldError>) {
        for (field, value) in [
            ("fullName", &self.full_name),
            ("street", &self.street),
            ("city", &self.city),
            ("province", &self.province),
        ] {
            if value.trim().is_empty() {
                errors.push(FieldError::required(field));
            }
        }

        if self.phone.trim().is_empty() {
            errors.push(FieldError::required("phone"));
        } else if !is_valid_phone(&self.phone) {
            errors.push(FieldError::new(
                "phone",
                "Please enter a valid Pakistani phone number",
            ));
        }
    }
}

/// `(+92|0)?` followed by exactly ten digits.
fn is_valid_phone(phone: &str) -> bool {
    let digits = phone
        .strip_prefix("+92")
        .or_else(|| phone.strip_prefix('0'))
        .unwrap_or(phone);

    digits.len() == 10 && digits.bytes().all(|b| b.is_ascii_digit())
}

/// A frozen line snapshot: later catalog edits never touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub product_uuid: ProductUuid,
    pub name: String,
    pub unit_price: u64,
    pub quantity: u32,
    pub size: Option<Size>,
    pub image: String,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> u64 {
        self.unit_price * u64::from(self.quantity)
    }
}

/// One entry in the append-only status log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub note: String,
    pub occurred_at: Timestamp,
}

/// Order Model
///
/// Immutable once written, except for the status fields the lifecycle
/// transitions touch.
#[derive(Debug, Clone)]
pub struct Order {
    pub uuid: OrderUuid,
    pub order_number: String,
    pub user_uuid: UserUuid,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub subtotal: u64,
    pub shipping_cost: u64,
    pub total: u64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub status_history: Vec<StatusHistoryEntry>,
    pub delivered_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Placement payload.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

impl NewOrder {
    /// Validate the payload before any store is touched.
    ///
    /// # Errors
    ///
    /// Returns every offending field, not just the first.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        self.shipping_address.collect_field_errors(&mut errors);

        if self.notes.as_ref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
            errors.push(FieldError::new(
                "notes",
                format!("must not exceed {MAX_NOTES_LEN} characters"),
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Admin status-update payload.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub note: Option<String>,
}

/// Admin listing filter; `None` fields do not constrain.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

/// Per-status rollup for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBucket {
    pub status: OrderStatus,
    pub count: u64,
    pub revenue: u64,
}

/// Orders and revenue since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TodayStats {
    pub orders: u64,
    pub revenue: u64,
}

/// Aggregate order statistics.
#[derive(Debug, Clone)]
pub struct OrderStats {
    pub by_status: Vec<StatusBucket>,
    pub today: TodayStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ayesha Khan".to_string(),
            street: "House 12, Street 4, F-8/3".to_string(),
            city: "Islamabad".to_string(),
            province: "ICT".to_string(),
            postal_code: Some("44000".to_string()),
            phone: "03001234567".to_string(),
        }
    }

    fn new_order() -> NewOrder {
        NewOrder {
            shipping_address: address(),
            payment_method: PaymentMethod::Cod,
            notes: None,
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(new_order().validate().is_ok());
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let mut order = new_order();
        order.shipping_address.full_name = String::new();
        order.shipping_address.city = "  ".to_string();

        let errors = order.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();

        assert_eq!(fields, vec!["fullName", "city"]);
    }

    #[test]
    fn postal_code_is_optional() {
        let mut order = new_order();
        order.shipping_address.postal_code = None;

        assert!(order.validate().is_ok());
    }

    #[test]
    fn phone_accepts_local_and_international_prefixes() {
        for phone in ["03001234567", "+923001234567", "3001234567"] {
            assert!(is_valid_phone(phone), "{phone} should be valid");
        }
    }

    #[test]
    fn phone_rejects_wrong_lengths_and_letters() {
        for phone in ["0300123456", "030012345678", "03001abc567", ""] {
            assert!(!is_valid_phone(phone), "{phone} should be invalid");
        }
    }

    #[test]
    fn overlong_notes_are_rejected() {
        let mut order = new_order();
        order.notes = Some("x".repeat(MAX_NOTES_LEN + 1));

        let errors = order.validate().unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "notes");
    }

    #[test]
    fn order_statuses_round_trip_through_wire_names() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Returned,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().ok(), Some(status));
        }
    }

    #[test]
    fn payment_methods_round_trip_through_wire_names() {
        for method in [
            PaymentMethod::Cod,
            PaymentMethod::BankTransfer,
            PaymentMethod::JazzCash,
            PaymentMethod::EasyPaisa,
            PaymentMethod::Card,
        ] {
            assert_eq!(method.as_str().parse::<PaymentMethod>().ok(), Some(method));
        }
    }

    #[test]
    fn line_total_multiplies_out() {
        let item = OrderItem {
            product_uuid: ProductUuid::new(),
            name: "Kids Festive Shalwar Kameez".to_string(),
            unit_price: 1800,
            quantity: 3,
            size: Some(Size::S),
            image: String::new(),
        };

        assert_eq!(item.line_total(), 5400);
    }
}
