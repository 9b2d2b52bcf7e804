//! Search index builder.
//!
//! Builds the search index in the background from the catalog snapshot and
//! local content pages.

use harbor_core::Dataset;
use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer,
};
use tantivy::{Index, IndexWriter, doc};
use tracing::{debug, error, info, instrument};

use crate::content::ContentStore;
use crate::db::Store;

use super::{DocType, SearchError, SearchFields, SearchIndex, TOKENIZER};

/// Writer heap budget.
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Spawn a background task to build the search index.
///
/// The index will be populated asynchronously. Until complete,
/// `SearchIndex::search()` returns empty results.
pub fn build_index_async(search_index: SearchIndex, store: Store, content: ContentStore) {
    info!("Spawning background search index build task");
    tokio::spawn(async move {
        let dataset = store.read().await.clone();
        let result =
            tokio::task::spawn_blocking(move || rebuild(&search_index, &dataset, &content)).await;
        match result {
            Ok(Ok(docs)) => info!(docs, "Search index is now ready and serving requests"),
            Ok(Err(e)) => error!(error = %e, "Failed to build search index"),
            Err(e) => error!(error = %e, "Search index build task panicked"),
        }
    });
}

/// Build a fresh index and swap it in. Returns the number of documents.
#[instrument(skip_all)]
pub(crate) fn rebuild(
    search_index: &SearchIndex,
    dataset: &Dataset,
    content: &ContentStore,
) -> Result<u64, SearchError> {
    let (schema, fields) = SearchIndex::build_schema();
    let index = Index::create_in_ram(schema);

    index.tokenizers().register(
        TOKENIZER,
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(40))
            .filter(LowerCaser)
            .filter(Stemmer::new(Language::English))
            .build(),
    );

    let mut writer: IndexWriter = index
        .writer(WRITER_HEAP_BYTES)
        .map_err(|e| SearchError::Build(format!("Failed to create writer: {e}")))?;

    let products = index_products(dataset, &writer, &fields)?;
    let categories = index_categories(dataset, &writer, &fields)?;
    let pages = index_pages(content, &writer, &fields)?;
    info!(products, categories, pages, "Indexed documents");

    writer
        .commit()
        .map_err(|e| SearchError::Build(format!("Failed to commit index: {e}")))?;

    search_index.set_ready(index, fields)?;
    Ok(products + categories + pages)
}

fn add(writer: &IndexWriter, doc: tantivy::TantivyDocument) -> Result<(), SearchError> {
    writer
        .add_document(doc)
        .map(|_| ())
        .map_err(|e| SearchError::Build(format!("Failed to add document: {e}")))
}

fn index_products(
    dataset: &Dataset,
    writer: &IndexWriter,
    fields: &SearchFields,
) -> Result<u64, SearchError> {
    let mut count = 0;
    for product in dataset.active_products() {
        let category = dataset
            .category(product.category_id)
            .map(|c| c.name.as_str())
            .unwrap_or_default();
        let tags = format!("{} {} {}", product.brand, category, product.tags.join(" "));

        add(
            writer,
            doc!(
                fields.doc_type => DocType::Product.as_str(),
                fields.slug => product.slug.as_str(),
                fields.title => product.name.as_str(),
                fields.description => product.description.as_str(),
                fields.title_text => product.name.as_str(),
                fields.body_text => product.description.as_str(),
                fields.tags_text => tags,
            ),
        )?;
        debug!(slug = %product.slug, "Indexed product");
        count += 1;
    }
    Ok(count)
}

fn index_categories(
    dataset: &Dataset,
    writer: &IndexWriter,
    fields: &SearchFields,
) -> Result<u64, SearchError> {
    let mut count = 0;
    for category in &dataset.categories {
        add(
            writer,
            doc!(
                fields.doc_type => DocType::Category.as_str(),
                fields.slug => category.slug.as_str(),
                fields.title => category.name.as_str(),
                fields.description => category.description.as_str(),
                fields.title_text => category.name.as_str(),
                fields.body_text => category.description.as_str(),
            ),
        )?;
        count += 1;
    }
    Ok(count)
}

fn index_pages(
    content: &ContentStore,
    writer: &IndexWriter,
    fields: &SearchFields,
) -> Result<u64, SearchError> {
    let mut count = 0;
    for page in content.pages() {
        let description = page.meta.description.as_deref().unwrap_or_default();
        add(
            writer,
            doc!(
                fields.doc_type => DocType::Page.as_str(),
                fields.slug => page.slug.as_str(),
                fields.title => page.meta.title.as_str(),
                fields.description => description,
                fields.title_text => page.meta.title.as_str(),
                fields.body_text => page.text.as_str(),
            ),
        )?;
        count += 1;
    }
    Ok(count)
}
