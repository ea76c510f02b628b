//! Integration tests for the reporting service over an in-memory store.

use analytics::{Bucket, CategoryKey, ReportingService, SalesFilter};
use chrono::{Duration, TimeZone, Utc};
use common::{Category, Money, OrderId, OrderStatus, ProductId, Role, UserId};
use domain::{ErrorKind, Identity, StorefrontSettings};
use store::{DomainStore, InMemoryStore, Order, OrderLine, Product, User, Version};

fn identity(role: Role) -> Identity {
    Identity {
        user_id: UserId::new(),
        subject: "auth0|reports".to_string(),
        display_name: "Reporter".to_string(),
        email: "reports@example.com".to_string(),
        role,
    }
}

async fn add_seller(store: &InMemoryStore) -> UserId {
    let id = UserId::new();
    let now = Utc::now();
    store
        .insert_user(User {
            id,
            external_subject_id: format!("auth0|seller-{id}"),
            display_name: "Seller".to_string(),
            email: format!("seller-{id}@example.com"),
            role: Role::User,
            created_at: now,
            updated_at: now,
            version: Version::default(),
        })
        .await
        .unwrap()
        .id
}

async fn add_product(store: &InMemoryStore, name: &str, category: Category, cents: i64) -> Product {
    let seller = add_seller(store).await;
    let now = Utc::now();
    store
        .insert_product(Product {
            id: ProductId::new(),
            name: name.to_string(),
            category,
            description: None,
            image_url: format!("/img/{name}.png"),
            price: Money::from_cents(cents),
            count_in_stock: 100,
            created_by: seller,
            created_at: now,
            updated_at: now,
            version: Version::default(),
        })
        .await
        .unwrap()
}

async fn add_order(
    store: &InMemoryStore,
    lines: &[(&Product, u32)],
    created_at: chrono::DateTime<Utc>,
) -> Order {
    let items: Vec<OrderLine> = lines
        .iter()
        .map(|(product, quantity)| OrderLine {
            product_id: product.id,
            product_name: product.name.clone(),
            image_url: product.image_url.clone(),
            quantity: *quantity,
            unit_price: product.price,
        })
        .collect();
    store
        .place_order(
            Order {
                id: OrderId::new(),
                purchaser_id: UserId::new(),
                purchaser_name: "Buyer".to_string(),
                total_amount: Order::total_of(&items).unwrap(),
                items,
                status: OrderStatus::Unprocessed,
                stock_reserved: false,
                created_at,
                updated_at: created_at,
                version: Version::default(),
            },
            &[],
        )
        .await
        .unwrap()
}

fn reports(store: &InMemoryStore) -> ReportingService<InMemoryStore> {
    ReportingService::new(store.clone(), &StorefrontSettings::default()).unwrap()
}

#[tokio::test]
async fn reports_are_admin_only() {
    let store = InMemoryStore::new();
    let service = reports(&store);
    let user = identity(Role::User);

    let err = service
        .top_selling_products(&user, SalesFilter::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = service
        .category_sales(&user, SalesFilter::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = service
        .sales_over_time(&user, Bucket::Day, SalesFilter::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn empty_store_gives_empty_reports() {
    let store = InMemoryStore::new();
    let service = reports(&store);
    let admin = identity(Role::Admin);

    assert!(service.top_selling_products(&admin, SalesFilter::new()).await.unwrap().is_empty());
    assert!(service.category_sales(&admin, SalesFilter::new()).await.unwrap().is_empty());
    assert!(
        service
            .sales_over_time(&admin, Bucket::Month, SalesFilter::new())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn top_selling_uses_current_names_and_sums() {
    let store = InMemoryStore::new();
    let service = reports(&store);
    let admin = identity(Role::Admin);
    let a = add_product(&store, "A", Category::Tops, 100).await;
    let b = add_product(&store, "B", Category::Bottoms, 100).await;
    let c = add_product(&store, "C", Category::Shoes, 100).await;
    let now = Utc::now();

    add_order(&store, &[(&a, 3), (&b, 5)], now).await;
    add_order(&store, &[(&a, 2), (&c, 1)], now).await;

    let mut renamed = a.clone();
    renamed.name = "A (renamed)".to_string();
    store
        .update_product(renamed, store::WriteOptions::new())
        .await
        .unwrap();

    let rows = service
        .top_selling_products(&admin, SalesFilter::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].units_sold, 5);
    assert_eq!(rows[1].units_sold, 5);
    // Equal sums: ascending product id decides.
    assert!(rows[0].product_id < rows[1].product_id);
    assert_eq!(rows[2].product_id, c.id);

    let a_row = rows.iter().find(|r| r.product_id == a.id).unwrap();
    assert_eq!(a_row.name, "A (renamed)");
}

#[tokio::test]
async fn category_revenue_matches_worked_example() {
    let store = InMemoryStore::new();
    let service = reports(&store);
    let admin = identity(Role::Admin);
    let a = add_product(&store, "A", Category::Tops, 1000).await;
    let now = Utc::now();
    add_order(&store, &[(&a, 2)], now).await;
    add_order(&store, &[(&a, 3)], now).await;

    let rows = service
        .category_sales(&admin, SalesFilter::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].category, CategoryKey::Current(Category::Tops));
    assert_eq!(rows[0].revenue, Money::from_cents(5000));
}

#[tokio::test]
async fn deleted_products_are_reported_as_unavailable() {
    let store = InMemoryStore::new();
    let service = reports(&store);
    let admin = identity(Role::Admin);
    let gone = add_product(&store, "Gone", Category::Dresses, 400).await;
    add_order(&store, &[(&gone, 1)], Utc::now()).await;
    store.delete_product(gone.id).await.unwrap();

    let categories = service
        .category_sales(&admin, SalesFilter::new())
        .await
        .unwrap();
    assert_eq!(categories[0].category, CategoryKey::Unavailable);

    let top = service
        .top_selling_products(&admin, SalesFilter::new())
        .await
        .unwrap();
    assert!(!top[0].available);
    assert_eq!(top[0].name, "Gone");
}

#[tokio::test]
async fn time_series_respects_window_and_offset() {
    let store = InMemoryStore::new();
    let settings = StorefrontSettings {
        reporting_offset_minutes: -5 * 60,
        ..Default::default()
    };
    let service = ReportingService::new(store.clone(), &settings).unwrap();
    let admin = identity(Role::Admin);
    let p = add_product(&store, "P", Category::Tops, 250).await;

    // 02:00 UTC on the 2nd is still the 1st at UTC-05:00.
    let day_two_utc = Utc.with_ymd_and_hms(2024, 6, 2, 2, 0, 0).unwrap();
    add_order(&store, &[(&p, 1)], day_two_utc).await;
    add_order(&store, &[(&p, 2)], day_two_utc + Duration::hours(12)).await;
    add_order(&store, &[(&p, 4)], day_two_utc + Duration::days(30)).await;

    let window = SalesFilter::between(day_two_utc - Duration::days(1), day_two_utc + Duration::days(2));
    let rows = service
        .sales_over_time(&admin, Bucket::Day, window)
        .await
        .unwrap();
    let labels: Vec<_> = rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["2024-06-01", "2024-06-02"]);
    assert_eq!(rows[0].revenue, Money::from_cents(250));
    assert_eq!(rows[1].revenue, Money::from_cents(500));

    let monthly = service
        .sales_over_time(&admin, Bucket::Month, SalesFilter::new())
        .await
        .unwrap();
    assert_eq!(monthly.len(), 2);
    assert_eq!(monthly[0].order_count, 2);
    assert_eq!(monthly[1].revenue, Money::from_cents(1000));
}

#[tokio::test]
async fn inverted_window_is_invalid_input() {
    let store = InMemoryStore::new();
    let service = reports(&store);
    let now = Utc::now();
    let err = service
        .category_sales(&identity(Role::Admin), SalesFilter::between(now, now - Duration::days(1)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn out_of_range_offset_is_rejected() {
    let settings = StorefrontSettings {
        reporting_offset_minutes: 48 * 60,
        ..Default::default()
    };
    assert!(ReportingService::new(InMemoryStore::new(), &settings).is_err());
}
