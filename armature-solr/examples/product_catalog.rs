//! Product catalogue walkthrough against a running Solr.
//!
//! ```bash
//! SOLR_URL=http://localhost:8983/solr SOLR_COLLECTION=collection1 \
//!     cargo run -p armature-solr --example product_catalog
//! ```

use armature_solr::prelude::*;
use armature_solr::logging;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let client = Arc::new(SolrClient::from_env()?);
    let collection = client.config().collection.clone();

    if !client.ping(&collection).await? {
        return Err(format!("Solr collection {} is not answering", collection).into());
    }

    let mut products = ProductRepository::new(client.clone());
    let mapping =
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/named-queries.toml");
    if mapping.exists() {
        products = products.with_named_queries(NamedQueries::from_file(&mapping)?);
    }

    let initial = products.count().await?;
    info!(initial, "Products in index");

    let product = Product::new("1000", "product-1000")
        .with_category("test")
        .with_popularity(10000);
    products.save(product).await?;
    info!(count = products.count().await?, "Saved product 1000");

    if let Some(mut loaded) = products.find_one("1000").await? {
        loaded.name = "changed named".to_string();
        products.save(loaded).await?;
    }

    let popular = products
        .find_by_popularity_greater_than_equal(10000, PageRequest::of(0, 10))
        .await?;
    for product in popular.content() {
        info!(id = %product.id, name = %product.name, "Popular product");
    }

    let about_solr = products
        .find_by_name_or_category("solr", Sort::desc("id"))
        .await?;
    info!(matches = about_solr.len(), "Products about solr");

    let everything = client
        .query_for_page::<Product>(&SearchQuery::new(Query::raw("*:*")))
        .await?;
    info!(total = everything.total_elements(), "Match-all query");

    client
        .delete_matching::<Product>(&Query::raw("cat:test"))
        .await?;
    info!(count = products.count().await?, "Removed test products");

    Ok(())
}
