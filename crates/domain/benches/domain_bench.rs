use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use document_store::InMemoryDocumentStore;
use domain::{InMemoryMailer, Money, Product, RequestContext, Shop, ShopSettings, UserId};

fn create_shop() -> Shop<InMemoryDocumentStore> {
    Shop::new(
        InMemoryDocumentStore::new(),
        Arc::new(InMemoryMailer::new()),
        ShopSettings::default(),
    )
}

async fn seed(shop: &Shop<InMemoryDocumentStore>, n: usize) -> Vec<Product> {
    let mut products = Vec::with_capacity(n);
    for i in 0..n {
        let product =
            Product::new(format!("Product {i}"), "", Money::from_cents(100 + i as i64), "")
                .unwrap();
        shop.catalog().add_product(&product).await.unwrap();
        products.push(product);
    }
    products
}

fn bench_cart_add(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let shop = create_shop();
    let products = rt.block_on(seed(&shop, 1));
    let user = UserId::new();

    c.bench_function("domain/cart_add_product", |b| {
        b.iter(|| {
            rt.block_on(async {
                shop.carts().add_product(user, products[0].id).await.unwrap();
            });
        });
    });
}

fn bench_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let shop = create_shop();
    let products = rt.block_on(seed(&shop, 5));

    c.bench_function("domain/fill_cart_and_checkout", |b| {
        b.iter(|| {
            rt.block_on(async {
                let ctx = RequestContext::new(UserId::new(), "bench@example.com");
                for product in &products {
                    shop.carts().add_product(ctx.user_id, product.id).await.unwrap();
                }
                shop.ledger().checkout(&ctx).await.unwrap();
            });
        });
    });
}

fn bench_cart_list(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let shop = create_shop();
    let products = rt.block_on(seed(&shop, 20));
    let user = UserId::new();
    rt.block_on(async {
        for product in &products {
            shop.carts().add_product(user, product.id).await.unwrap();
        }
    });

    c.bench_function("domain/cart_list_20_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let lines = shop.carts().list(user).await.unwrap();
                std::hint::black_box(lines);
            });
        });
    });
}

criterion_group!(benches, bench_cart_add, bench_checkout, bench_cart_list);
criterion_main!(benches);
