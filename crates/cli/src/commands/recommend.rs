use basketgraph_core::{Bundle, Recommender, ScoredItem, SimilarItem};
use serde::Serialize;

use super::{CommandResult, Workspace};

#[derive(Debug, Serialize)]
struct ItemRecommendations<'a> {
    item: &'a str,
    excluded: &'a [String],
    recommendations: Vec<ScoredItem<'a>>,
}

#[derive(Debug, Serialize)]
struct BasketRecommendations<'a> {
    basket: &'a [String],
    recommendations: Vec<ScoredItem<'a>>,
}

#[derive(Debug, Serialize)]
struct BundlesPayload<'a> {
    min_size: usize,
    max_size: usize,
    bundles: Vec<Bundle<'a>>,
}

#[derive(Debug, Serialize)]
struct SimilarPayload<'a> {
    item: &'a str,
    similar: Vec<SimilarItem<'a>>,
}

fn recommender(workspace: &Workspace) -> Recommender<'_> {
    Recommender::new(&workspace.graph)
        .with_basket_candidate_cap(workspace.config.recommend.basket_candidate_cap)
}

pub fn item<'a>(
    workspace: &'a Workspace,
    item: &'a str,
    exclude: &'a [String],
    limit: usize,
) -> CommandResult {
    let recommendations = recommender(workspace).recommend_for_item_excluding(item, limit, exclude);
    CommandResult::success(
        "recommend",
        ItemRecommendations { item, excluded: exclude, recommendations },
    )
}

pub fn basket<'a>(workspace: &'a Workspace, basket: &'a [String], limit: usize) -> CommandResult {
    let recommendations = recommender(workspace).recommend_for_basket(basket, limit);
    CommandResult::success("basket", BasketRecommendations { basket, recommendations })
}

pub fn bundles(
    workspace: &Workspace,
    min_size: usize,
    max_size: usize,
    top: usize,
) -> CommandResult {
    match recommender(workspace).find_product_bundles(min_size, max_size, top) {
        Ok(bundles) => {
            CommandResult::success("bundles", BundlesPayload { min_size, max_size, bundles })
        }
        Err(error) => CommandResult::from_analysis_error("bundles", &error),
    }
}

pub fn similar<'a>(workspace: &'a Workspace, item: &'a str, limit: usize) -> CommandResult {
    let similar = recommender(workspace).get_similar_items(item, limit);
    CommandResult::success("similar", SimilarPayload { item, similar })
}
