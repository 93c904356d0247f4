use clap::Args;
use poshak_app::{
    auth::{Identity, Role, UserUuid, generate_auth_key},
    context::AppContext,
    domain::{
        categories::models::{CategoryUuid, NewCategory},
        products::models::{FabricType, Gender, NewProduct, ProductUuid, Season, Size},
    },
};
use sqlx::query;
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct SeedArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
}

struct SeedCategory {
    name: &'static str,
    description: &'static str,
}

const CATEGORIES: &[SeedCategory] = &[
    SeedCategory { name: "Men", description: "Shalwar Kameez for Men" },
    SeedCategory { name: "Women", description: "Shalwar Kameez for Women" },
    SeedCategory { name: "Kids", description: "Shalwar Kameez for Kids" },
    SeedCategory { name: "Designer", description: "Premium Designer Collection" },
    SeedCategory { name: "Eid Collection", description: "Special Eid Collection" },
    SeedCategory { name: "Wedding Collection", description: "Wedding & Formal Wear" },
    SeedCategory { name: "Winter Collection", description: "Warm Winter Fabrics" },
];

pub(crate) async fn run(args: SeedArgs) -> Result<(), String> {
    let ctx = AppContext::from_database_url(&args.database_url, generate_auth_key())
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let pool = poshak_app::database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    // Clear existing data, children first.
    for table in [
        "order_status_history",
        "order_items",
        "orders",
        "cart_items",
        "carts",
        "reviews",
        "products",
        "categories",
        "users",
    ] {
        query(&format!("DELETE FROM {table}"))
            .execute(&pool)
            .await
            .map_err(|error| format!("failed to clear {table}: {error}"))?;
    }

    let admin = create_user(&pool, "Admin User", "admin@poshak.pk", Role::Admin).await?;
    create_user(&pool, "Test User", "user@test.pk", Role::Customer).await?;

    let identity = Identity {
        user_uuid: admin,
        name: "Admin User".to_string(),
        email: "admin@poshak.pk".to_string(),
        role: Role::Admin,
    };

    let mut category_uuids: Vec<(&'static str, CategoryUuid)> = Vec::new();

    for (index, category) in CATEGORIES.iter().enumerate() {
        let created = ctx
            .categories
            .create_category(
                &identity,
                NewCategory {
                    uuid: CategoryUuid::new(),
                    name: category.name.to_string(),
                    description: Some(category.description.to_string()),
                    parent_uuid: None,
                    image: None,
                    display_order: index as i32,
                },
            )
            .await
            .map_err(|error| format!("failed to create category {}: {error}", category.name))?;

        category_uuids.push((category.name, created.uuid));
    }

    let mut created_products = 0_u32;

    for product in sample_products(&category_uuids) {
        let name = product.name.clone();

        ctx.products
            .create_product(&identity, product)
            .await
            .map_err(|error| format!("failed to create product {name}: {error}"))?;

        created_products += 1;
    }

    println!("seeded {} categories", CATEGORIES.len());
    println!("seeded {created_products} products");
    println!("admin: admin@poshak.pk");
    println!("customer: user@test.pk");

    Ok(())
}

async fn create_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    role: Role,
) -> Result<UserUuid, String> {
    let uuid = Uuid::now_v7();

    query("INSERT INTO users (uuid, name, email, role) VALUES ($1, $2, $3, $4)")
        .bind(uuid)
        .bind(name)
        .bind(email)
        .bind(role.as_str())
        .execute(pool)
        .await
        .map_err(|error| format!("failed to create user {email}: {error}"))?;

    Ok(UserUuid::from_uuid(uuid))
}

fn category_for(
    gender: Gender,
    season: Season,
    categories: &[(&'static str, CategoryUuid)],
) -> CategoryUuid {
    let name = match (gender, season) {
        (_, Season::Wedding) => "Wedding Collection",
        (_, Season::Eid) => "Eid Collection",
        (Gender::Men, Season::Winter) => "Winter Collection",
        (Gender::Women, _) => "Women",
        (Gender::Kids, _) => "Kids",
        _ => "Men",
    };

    categories
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .or_else(|| categories.first())
        .map(|(_, uuid)| *uuid)
        .unwrap_or_default()
}

fn sample_products(categories: &[(&'static str, CategoryUuid)]) -> Vec<NewProduct> {
    let product = |name: &str,
                   brand: &str,
                   fabric_type: FabricType,
                   sizes: Vec<Size>,
                   color: &str,
                   price: u64,
                   discount_price: Option<u64>,
                   stock_quantity: u32,
                   description: &str,
                   season: Season,
                   gender: Gender,
                   is_featured: bool,
                   image: &str| NewProduct {
        uuid: ProductUuid::new(),
        name: name.to_string(),
        brand: Some(brand.to_string()),
        category_uuid: category_for(gender, season, categories),
        fabric_type,
        sizes,
        color: Some(color.to_string()),
        price,
        discount_price,
        stock_quantity,
        images: vec![image.to_string()],
        description: Some(description.to_string()),
        season,
        gender,
        is_featured,
    };

    vec![
        product(
            "Classic White Cotton Shalwar Kameez",
            "Gul Ahmed",
            FabricType::Cotton,
            vec![Size::S, Size::M, Size::L, Size::Xl],
            "White",
            3500,
            None,
            50,
            "Premium quality white cotton shalwar kameez, perfect for daily wear and office.",
            Season::AllSeason,
            Gender::Men,
            true,
            "/uploads/products/white-cotton-men.jpg",
        ),
        product(
            "Embroidered Lawn Suit",
            "Khaadi",
            FabricType::Lawn,
            vec![Size::S, Size::M, Size::L, Size::Xl],
            "Blue",
            5500,
            Some(4500),
            30,
            "Beautiful embroidered lawn suit with intricate designs.",
            Season::Summer,
            Gender::Women,
            true,
            "/uploads/products/lawn-blue-women.jpg",
        ),
        product(
            "Kids Festive Shalwar Kameez",
            "Junaid Jamshed",
            FabricType::Silk,
            vec![Size::Xs, Size::S, Size::M],
            "Gold",
            4000,
            None,
            25,
            "Elegant festive wear for kids, perfect for Eid and family gatherings.",
            Season::Eid,
            Gender::Kids,
            true,
            "/uploads/products/kids-gold-silk.jpg",
        ),
        product(
            "Premium Karandi Winter Suit",
            "Bonanza",
            FabricType::Karandi,
            vec![Size::M, Size::L, Size::Xl, Size::Xxl],
            "Maroon",
            6500,
            None,
            20,
            "Warm and stylish karandi suit for winter season.",
            Season::Winter,
            Gender::Men,
            false,
            "/uploads/products/karandi-maroon-men.jpg",
        ),
        product(
            "Chiffon Party Wear",
            "Maria B",
            FabricType::Chiffon,
            vec![Size::S, Size::M, Size::L],
            "Pink",
            12000,
            Some(9999),
            15,
            "Elegant chiffon party wear with hand embroidery.",
            Season::Wedding,
            Gender::Women,
            true,
            "/uploads/products/chiffon-pink-women.jpg",
        ),
        product(
            "Velvet Sherwani Collection",
            "HSY",
            FabricType::Velvet,
            vec![Size::M, Size::L, Size::Xl],
            "Black",
            25000,
            None,
            10,
            "Luxurious velvet sherwani for weddings and formal events.",
            Season::Wedding,
            Gender::Men,
            true,
            "/uploads/products/velvet-black-sherwani.jpg",
        ),
    ]
}
