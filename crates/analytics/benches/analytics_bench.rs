use std::collections::HashMap;

use analytics::{
    Bucket, CategorySales, ReportingService, RevenueOverTime, SalesFilter, TopSelling,
};
use chrono::{Duration, FixedOffset, Utc};
use common::{Category, Money, OrderId, OrderStatus, ProductId, Role, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Identity, StorefrontSettings};
use store::{DomainStore, InMemoryStore, Order, OrderLine, Product, User, Version};

fn catalog(n: usize, owner: UserId) -> Vec<Product> {
    let now = Utc::now();
    (0..n)
        .map(|i| Product {
            id: ProductId::new(),
            name: format!("Product {i}"),
            category: Category::ALL[i % Category::ALL.len()],
            description: None,
            image_url: format!("/img/{i}.png"),
            price: Money::from_cents(500 + (i as i64 % 50) * 100),
            count_in_stock: 1_000,
            created_by: owner,
            created_at: now,
            updated_at: now,
            version: Version::first(),
        })
        .collect()
}

/// N orders of three lines each, spread over roughly a year.
fn orders(products: &[Product], n: usize) -> Vec<Order> {
    let start = Utc::now() - Duration::days(365);
    (0..n)
        .map(|i| {
            let items: Vec<OrderLine> = (0..3)
                .map(|j| {
                    let product = &products[(i * 7 + j * 13) % products.len()];
                    OrderLine {
                        product_id: product.id,
                        product_name: product.name.clone(),
                        image_url: product.image_url.clone(),
                        quantity: 1 + (i + j) as u32 % 4,
                        unit_price: product.price,
                    }
                })
                .collect();
            let created_at = start + Duration::minutes(i as i64 * 37);
            Order {
                id: OrderId::new(),
                purchaser_id: UserId::new(),
                purchaser_name: "Bench".to_string(),
                total_amount: Order::total_of(&items).unwrap(),
                items,
                status: OrderStatus::Unprocessed,
                stock_reserved: false,
                created_at,
                updated_at: created_at,
                version: Version::first(),
            }
        })
        .collect()
}

fn bench_pipeline_10000_orders(c: &mut Criterion) {
    let products = catalog(200, UserId::new());
    let orders = orders(&products, 10_000);
    let by_id: HashMap<ProductId, Product> = products.iter().map(|p| (p.id, p.clone())).collect();
    let utc = FixedOffset::east_opt(0).unwrap();

    c.bench_function("analytics/pipeline_10000_orders", |b| {
        b.iter(|| {
            let mut top = TopSelling::new();
            let mut categories = CategorySales::new();
            let mut daily = RevenueOverTime::new(Bucket::Day, utc);
            for order in &orders {
                top.add(order);
                categories.add(order).unwrap();
                daily.add(order).unwrap();
            }
            (
                top.finish(10, &by_id),
                categories.finish(&by_id).unwrap(),
                daily.finish(),
            )
        });
    });
}

fn bench_reports_over_store(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let now = Utc::now();
    let seller = User {
        id: UserId::new(),
        external_subject_id: "bench|seller".to_string(),
        display_name: "Seller".to_string(),
        email: "seller@example.com".to_string(),
        role: Role::User,
        created_at: now,
        updated_at: now,
        version: Version::default(),
    };
    let products = catalog(200, seller.id);

    rt.block_on(async {
        store.insert_user(seller).await.unwrap();
        for product in &products {
            store.insert_product(product.clone()).await.unwrap();
        }
        for order in orders(&products, 2_000) {
            store.place_order(order, &[]).await.unwrap();
        }
    });

    let service = ReportingService::new(store, &StorefrontSettings::default()).unwrap();
    let admin = Identity {
        user_id: UserId::new(),
        subject: "bench".to_string(),
        display_name: "Bench".to_string(),
        email: "bench@example.com".to_string(),
        role: Role::Admin,
    };

    c.bench_function("analytics/category_sales_2000_orders", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .category_sales(&admin, SalesFilter::new())
                    .await
                    .unwrap()
            })
        });
    });

    c.bench_function("analytics/monthly_sales_2000_orders", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .sales_over_time(&admin, Bucket::Month, SalesFilter::new())
                    .await
                    .unwrap()
            })
        });
    });
}

criterion_group!(benches, bench_pipeline_10000_orders, bench_reports_over_store);
criterion_main!(benches);
