//! Integration tests for the Products domain
//!
//! These tests use real PostgreSQL via testcontainers to ensure:
//! - Queries and filters behave as in production
//! - The unique name constraint is enforced
//! - Failed writes roll back and leave rows untouched
//! - Concurrent writers cannot both claim a name

use domain_products::*;
use rust_decimal::dec;
use test_utils::{TestDataBuilder, TestDatabase, assertions::*};

fn create_input(name: &str) -> CreateProduct {
    CreateProduct {
        name: name.to_string(),
        quantity: 10,
        price: dec!(9.99),
        status: true,
        category: None,
    }
}

// ============================================================================
// Repository Tests
// ============================================================================

#[tokio::test]
async fn test_create_and_get_product() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("create_and_get");

    let input = CreateProduct {
        category: Some("tools".to_string()),
        ..create_input(&builder.name("product", "main"))
    };

    let created = repo.create(input.clone()).await.unwrap();

    assert_eq!(created.name, input.name);
    assert_eq!(created.quantity, 10);
    assert_eq!(created.price, dec!(9.99));
    assert!(created.status);
    assert_eq!(created.category.as_deref(), Some("tools"));
    assert_eq!(created.created_at, created.updated_at);

    let retrieved = repo.get_by_id(created.id).await.unwrap();
    let retrieved = assert_some(retrieved, "product should exist");

    assert_uuid_eq(retrieved.id, created.id, "retrieved product id");
    assert_eq!(retrieved, created);
}

#[tokio::test]
async fn test_price_is_stored_with_two_decimals() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("price_scale");

    let created = repo
        .create(CreateProduct {
            price: dec!(12.345),
            ..create_input(&builder.name("product", "main"))
        })
        .await
        .unwrap();
    assert_eq!(created.price, dec!(12.35));

    let retrieved = assert_some(repo.get_by_id(created.id).await.unwrap(), "stored");
    assert_eq!(retrieved.price, dec!(12.35));
}

#[tokio::test]
async fn test_duplicate_name_constraint() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("duplicate_name");
    let name = builder.name("product", "dup");

    repo.create(create_input(&name)).await.unwrap();

    let result = repo.create(create_input(&name)).await;
    assert!(
        matches!(result, Err(ProductError::IntegrityConflict(_))),
        "expected IntegrityConflict, got {:?}",
        result
    );

    let all = repo.list(ProductFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1, "failed insert must not leave a row behind");
}

#[tokio::test]
async fn test_get_missing_product_returns_none() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("get_missing");

    let result = repo.get_by_id(builder.id()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_partial_update() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("partial_update");

    let created = repo
        .create(CreateProduct {
            category: Some("tools".to_string()),
            ..create_input(&builder.name("product", "main"))
        })
        .await
        .unwrap();

    let updated = repo
        .update(
            created.id,
            UpdateProduct {
                quantity: Some(3),
                status: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.quantity, 3);
    assert!(!updated.status);
    assert_eq!(updated.name, created.name);
    assert_eq!(updated.price, created.price);
    assert_eq!(updated.category, created.category);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);

    let retrieved = assert_some(repo.get_by_id(created.id).await.unwrap(), "updated");
    assert_eq!(retrieved, updated);
}

#[tokio::test]
async fn test_updated_at_strictly_increases() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("updated_at_monotonic");

    let created = repo
        .create(create_input(&builder.name("product", "main")))
        .await
        .unwrap();

    let mut previous = created.updated_at;
    for quantity in 1..=5 {
        let updated = repo
            .update(
                created.id,
                UpdateProduct {
                    quantity: Some(quantity),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.updated_at > previous);
        previous = updated.updated_at;
    }

    // An empty patch still counts as an update
    let touched = repo
        .update(created.id, UpdateProduct::default())
        .await
        .unwrap();
    assert!(touched.updated_at > previous);
    assert_eq!(touched.quantity, 5);
}

#[tokio::test]
async fn test_update_clears_category() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("clear_category");

    let created = repo
        .create(CreateProduct {
            category: Some("tools".to_string()),
            ..create_input(&builder.name("product", "main"))
        })
        .await
        .unwrap();

    let updated = repo
        .update(
            created.id,
            UpdateProduct {
                category: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.category, None);
}

#[tokio::test]
async fn test_update_missing_product_is_not_found() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let id = TestDataBuilder::from_test_name("update_missing").id();

    let result = repo
        .update(
            id,
            UpdateProduct {
                quantity: Some(1),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(ProductError::NotFound(missing)) if missing == id));
}

#[tokio::test]
async fn test_update_to_taken_name_rolls_back() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("update_conflict");

    let first = repo
        .create(create_input(&builder.name("product", "first")))
        .await
        .unwrap();
    let second = repo
        .create(create_input(&builder.name("product", "second")))
        .await
        .unwrap();

    let result = repo
        .update(
            second.id,
            UpdateProduct {
                name: Some(first.name.clone()),
                quantity: Some(99),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(ProductError::IntegrityConflict(_))));

    let unchanged = assert_some(repo.get_by_id(second.id).await.unwrap(), "second");
    assert_eq!(unchanged, second);
}

#[tokio::test]
async fn test_delete_product() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("delete");

    let created = repo
        .create(create_input(&builder.name("product", "main")))
        .await
        .unwrap();

    assert!(repo.delete(created.id).await.unwrap());
    assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    assert!(!repo.delete(created.id).await.unwrap());
}

#[tokio::test]
async fn test_name_is_reusable_after_delete() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("reuse_after_delete");
    let name = builder.name("product", "main");

    let created = repo.create(create_input(&name)).await.unwrap();
    repo.delete(created.id).await.unwrap();

    let recreated = repo.create(create_input(&name)).await.unwrap();
    assert_ne!(recreated.id, created.id);
}

#[tokio::test]
async fn test_list_empty_table() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());

    let products = repo.list(ProductFilter::default()).await.unwrap();
    assert!(products.is_empty());
}

#[tokio::test]
async fn test_list_filters_case_insensitively() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());

    for (name, category) in [
        ("Widget", Some("Tools")),
        ("Wide Gadget", None),
        ("Sprocket", Some("power tools")),
        ("Gizmo", Some("toys")),
    ] {
        repo.create(CreateProduct {
            category: category.map(str::to_string),
            ..create_input(name)
        })
        .await
        .unwrap();
    }

    let all = repo.list(ProductFilter::default()).await.unwrap();
    let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Widget", "Wide Gadget", "Sprocket", "Gizmo"]);

    let by_name = repo
        .list(ProductFilter {
            name: Some("WID".to_string()),
            category: None,
        })
        .await
        .unwrap();
    assert_eq!(by_name.len(), 2);

    let by_category = repo
        .list(ProductFilter {
            name: None,
            category: Some("TOOL".to_string()),
        })
        .await
        .unwrap();
    let names: Vec<_> = by_category.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Widget", "Sprocket"]);

    let both = repo
        .list(ProductFilter {
            name: Some("o".to_string()),
            category: Some("tools".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].name, "Sprocket");

    let none = repo
        .list(ProductFilter {
            name: Some("nothing".to_string()),
            category: None,
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_list_treats_wildcards_literally() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());

    repo.create(create_input("50% off")).await.unwrap();
    repo.create(create_input("500 units")).await.unwrap();
    repo.create(create_input("snake_case")).await.unwrap();
    repo.create(create_input("snakeXcase")).await.unwrap();

    let percent = repo
        .list(ProductFilter {
            name: Some("0%".to_string()),
            category: None,
        })
        .await
        .unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].name, "50% off");

    let underscore = repo
        .list(ProductFilter {
            name: Some("e_c".to_string()),
            category: None,
        })
        .await
        .unwrap();
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].name, "snake_case");
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_creates_with_same_name() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("concurrent_same_name");
    let name = builder.name("product", "race");

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let repo = repo.clone();
            let input = create_input(&name);
            tokio::spawn(async move { repo.create(input).await })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(ProductError::IntegrityConflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 4);
}

// ============================================================================
// Service Tests
// ============================================================================

#[tokio::test]
async fn test_service_reports_not_found() {
    let db = TestDatabase::new().await;
    let service = ProductService::new(PgProductRepository::new(db.connection()));
    let id = TestDataBuilder::from_test_name("service_not_found").id();

    assert!(matches!(service.get(id).await, Err(ProductError::NotFound(_))));
    assert!(matches!(service.delete(id).await, Err(ProductError::NotFound(_))));
    assert!(matches!(
        service.update(id, UpdateProduct::default()).await,
        Err(ProductError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_service_rejects_invalid_input() {
    let db = TestDatabase::new().await;
    let service = ProductService::new(PgProductRepository::new(db.connection()));

    let result = service
        .create(CreateProduct {
            quantity: -1,
            ..create_input("Widget")
        })
        .await;
    assert!(matches!(result, Err(ProductError::Validation(_))));

    let products = service.query(ProductFilter::default()).await.unwrap();
    assert!(products.is_empty());
}
