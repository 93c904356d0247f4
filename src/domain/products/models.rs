//! Product Models

use std::{fmt, str::FromStr};

use jiff::Timestamp;

use crate::{
    domain::{ParseEnumError, categories::models::CategoryUuid},
    uuids::TypedUuid,
};

/// Product UUID
pub type ProductUuid = TypedUuid<Product>;

/// Longest allowed product name.
pub const MAX_NAME_LEN: usize = 200;

/// Longest allowed brand name.
pub const MAX_BRAND_LEN: usize = 100;

/// Longest allowed product description.
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Garment sizes carried by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Size {
    Xs,
    S,
    M,
    L,
    Xl,
    Xxl,
    Custom,
    FreeSize,
}

impl Size {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xs => "XS",
            Self::S => "S",
            Self::M => "M",
            Self::L => "L",
            Self::Xl => "XL",
            Self::Xxl => "XXL",
            Self::Custom => "Custom",
            Self::FreeSize => "Free Size",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Size {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "XS" => Ok(Self::Xs),
            "S" => Ok(Self::S),
            "M" => Ok(Self::M),
            "L" => Ok(Self::L),
            "XL" => Ok(Self::Xl),
            "XXL" => Ok(Self::Xxl),
            "Custom" => Ok(Self::Custom),
            "Free Size" => Ok(Self::FreeSize),
            _ => Err(ParseEnumError::new("size", value)),
        }
    }
}

/// Fabric the garment is cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FabricType {
    Cotton,
    Lawn,
    Silk,
    Chiffon,
    Linen,
    Karandi,
    Khaddar,
    Velvet,
    Organza,
    Net,
    Jacquard,
    Cambric,
}

impl FabricType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cotton => "Cotton",
            Self::Lawn => "Lawn",
            Self::Silk => "Silk",
            Self::Chiffon => "Chiffon",
            Self::Linen => "Linen",
            Self::Karandi => "Karandi",
            Self::Khaddar => "Khaddar",
            Self::Velvet => "Velvet",
            Self::Organza => "Organza",
            Self::Net => "Net",
            Self::Jacquard => "Jacquard",
            Self::Cambric => "Cambric",
        }
    }
}

impl fmt::Display for FabricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FabricType {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Cotton" => Ok(Self::Cotton),
            "Lawn" => Ok(Self::Lawn),
            "Silk" => Ok(Self::Silk),
            "Chiffon" => Ok(Self::Chiffon),
            "Linen" => Ok(Self::Linen),
            "Karandi" => Ok(Self::Karandi),
            "Khaddar" => Ok(Self::Khaddar),
            "Velvet" => Ok(Self::Velvet),
            "Organza" => Ok(Self::Organza),
            "Net" => Ok(Self::Net),
            "Jacquard" => Ok(Self::Jacquard),
            "Cambric" => Ok(Self::Cambric),
            _ => Err(ParseEnumError::new("fabric type", value)),
        }
    }
}

/// Season / occasion collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Season {
    Summer,
    Winter,
    Eid,
    Wedding,
    #[default]
    AllSeason,
    Spring,
}

impl Season {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summer => "Summer",
            Self::Winter => "Winter",
            Self::Eid => "Eid",
            Self::Wedding => "Wedding",
            Self::AllSeason => "All Season",
            Self::Spring => "Spring",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Summer" => Ok(Self::Summer),
            "Winter" => Ok(Self::Winter),
            "Eid" => Ok(Self::Eid),
            "Wedding" => Ok(Self::Wedding),
            "All Season" => Ok(Self::AllSeason),
            "Spring" => Ok(Self::Spring),
            _ => Err(ParseEnumError::new("season", value)),
        }
    }
}

/// Target audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Men,
    Women,
    Kids,
    Unisex,
}

impl Gender {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Men => "Men",
            Self::Women => "Women",
            Self::Kids => "Kids",
            Self::Unisex => "Unisex",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Men" => Ok(Self::Men),
            "Women" => Ok(Self::Women),
            "Kids" => Ok(Self::Kids),
            "Unisex" => Ok(Self::Unisex),
            _ => Err(ParseEnumError::new("gender", value)),
        }
    }
}

/// Product Model
#[derive(Debug, Clone)]
pub struct Product {
    pub uuid: ProductUuid,
    pub name: String,
    pub slug: String,
    pub brand: Option<String>,
    pub category_uuid: CategoryUuid,
    pub fabric_type: FabricType,
    pub sizes: Vec<Size>,
    pub color: Option<String>,
    pub price: u64,
    pub discount_price: Option<u64>,
    pub stock_quantity: u32,
    pub images: Vec<String>,
    pub description: Option<String>,
    pub season: Season,
    pub gender: Gender,
    pub is_active: bool,
    pub is_featured: bool,
    pub average_rating: f64,
    pub review_count: u32,
    pub sold_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Product {
    /// Price a buyer actually pays: the discount when one is set and valid.
    #[must_use]
    pub fn effective_price(&self) -> u64 {
        effective_price(self.price, self.discount_price)
    }

    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.discount_price.is_some_and(|d| d < self.price)
    }

    /// Rounded percentage off the regular price; 0 when not on sale.
    #[must_use]
    pub fn discount_percentage(&self) -> u32 {
        if self.price == 0 {
            return 0;
        }

        match self.discount_price {
            Some(discount) if discount < self.price => {
                let off = (self.price - discount) as f64 / self.price as f64 * 100.0;
                off.round() as u32
            }
            _ => 0,
        }
    }

    /// First catalog image, used for order-line snapshots.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Unit price given a regular price and an optional discount.
#[must_use]
pub fn effective_price(price: u64, discount_price: Option<u64>) -> u64 {
    match discount_price {
        Some(discount) if discount < price => discount,
        _ => price,
    }
}

/// New Product Model
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub name: String,
    pub brand: Option<String>,
    pub category_uuid: CategoryUuid,
    pub fabric_type: FabricType,
    pub sizes: Vec<Size>,
    pub color: Option<String>,
    pub price: u64,
    pub discount_price: Option<u64>,
    pub stock_quantity: u32,
    pub images: Vec<String>,
    pub description: Option<String>,
    pub season: Season,
    pub gender: Gender,
    pub is_featured: bool,
}

/// Product Update Model
///
/// `None` fields are left untouched; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub brand: Option<Option<String>>,
    pub category_uuid: Option<CategoryUuid>,
    pub fabric_type: Option<FabricType>,
    pub sizes: Option<Vec<Size>>,
    pub color: Option<Option<String>>,
    pub price: Option<u64>,
    pub discount_price: Option<Option<u64>>,
    pub stock_quantity: Option<u32>,
    pub images: Option<Vec<String>>,
    pub description: Option<Option<String>>,
    pub season: Option<Season>,
    pub gender: Option<Gender>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

impl ProductUpdate {
    /// Fold this update into an existing product. Slug handling is the
    /// service's concern.
    pub(crate) fn apply_to(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(brand) = self.brand {
            product.brand = brand;
        }
        if let Some(category_uuid) = self.category_uuid {
            product.category_uuid = category_uuid;
        }
        if let Some(fabric_type) = self.fabric_type {
            product.fabric_type = fabric_type;
        }
        if let Some(sizes) = self.sizes {
            product.sizes = sizes;
        }
        if let Some(color) = self.color {
            product.color = color;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(discount_price) = self.discount_price {
            product.discount_price = discount_price;
        }
        if let Some(stock_quantity) = self.stock_quantity {
            product.stock_quantity = stock_quantity;
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(season) = self.season {
            product.season = season;
        }
        if let Some(gender) = self.gender {
            product.gender = gender;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
        if let Some(is_featured) = self.is_featured {
            product.is_featured = is_featured;
        }
    }
}

/// Catalog listing filter; `None` fields do not constrain.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<CategoryUuid>,
    pub gender: Option<Gender>,
    pub fabric_type: Option<FabricType>,
    pub season: Option<Season>,
    pub size: Option<Size>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub is_featured: Option<bool>,
    /// Admin listings may include deactivated products.
    pub include_inactive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: u64, discount_price: Option<u64>) -> Product {
        Product {
            uuid: ProductUuid::new(),
            name: "Embroidered Lawn Suit".to_string(),
            slug: "embroidered-lawn-suit".to_string(),
            brand: None,
            category_uuid: CategoryUuid::new(),
            fabric_type: FabricType::Lawn,
            sizes: vec![Size::S, Size::M],
            color: None,
            price,
            discount_price,
            stock_quantity: 10,
            images: vec!["/uploads/products/lawn-blue-women.jpg".to_string()],
            description: None,
            season: Season::Summer,
            gender: Gender::Women,
            is_active: true,
            is_featured: false,
            average_rating: 0.0,
            review_count: 0,
            sold_count: 0,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn effective_price_prefers_valid_discount() {
        assert_eq!(product(2000, Some(1800)).effective_price(), 1800);
    }

    #[test]
    fn effective_price_ignores_discount_not_below_price() {
        assert_eq!(product(2000, Some(2000)).effective_price(), 2000);
        assert_eq!(product(2000, Some(2500)).effective_price(), 2000);
    }

    #[test]
    fn effective_price_without_discount_is_regular_price() {
        assert_eq!(product(1000, None).effective_price(), 1000);
    }

    #[test]
    fn discount_percentage_rounds() {
        assert_eq!(product(3000, Some(2000)).discount_percentage(), 33);
        assert_eq!(product(2000, None).discount_percentage(), 0);
    }

    #[test]
    fn sizes_round_trip_through_wire_names() {
        for size in [
            Size::Xs,
            Size::S,
            Size::M,
            Size::L,
            Size::Xl,
            Size::Xxl,
            Size::Custom,
            Size::FreeSize,
        ] {
            assert_eq!(size.as_str().parse::<Size>().ok(), Some(size));
        }
    }

    #[test]
    fn free_size_uses_spaced_wire_name() {
        assert_eq!(Size::FreeSize.as_str(), "Free Size");
        assert!("FreeSize".parse::<Size>().is_err());
    }

    #[test]
    fn update_clears_optional_fields_with_some_none() {
        let mut subject = product(2000, Some(1800));

        ProductUpdate {
            discount_price: Some(None),
            ..ProductUpdate::default()
        }
        .apply_to(&mut subject);

        assert_eq!(subject.discount_price, None);
        assert_eq!(subject.effective_price(), 2000);
    }

    #[test]
    fn update_leaves_unset_fields_untouched() {
        let mut subject = product(2000, Some(1800));

        ProductUpdate {
            price: Some(2500),
            ..ProductUpdate::default()
        }
        .apply_to(&mut subject);

        assert_eq!(subject.price, 2500);
        assert_eq!(subject.discount_price, Some(1800));
        assert_eq!(subject.name, "Embroidered Lawn Suit");
    }
}
