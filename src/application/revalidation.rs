//! Post-mutation revalidation hooks.
//!
//! Each committed mutation is turned into a [`RevalidationPlan`] and executed
//! against every configured [`Revalidator`] in order. Failures are logged and
//! counted, never returned: a mutation has already been persisted when its
//! hooks run.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::CategoriesRepo;
use crate::cache::{
    ContentEvent, Invalidation, PostLocation, RevalidationPlan, Revalidator,
};
use crate::domain::snapshots::DocumentSnapshot;
use crate::domain::types::Locale;

const TARGET: &str = "safecircle::application::revalidation";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevalidationReport {
    pub plan: RevalidationPlan,
    pub applied: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct RevalidationHooks {
    revalidators: Vec<Arc<dyn Revalidator>>,
    categories: Arc<dyn CategoriesRepo>,
}

impl RevalidationHooks {
    pub fn new(
        revalidators: Vec<Arc<dyn Revalidator>>,
        categories: Arc<dyn CategoriesRepo>,
    ) -> Self {
        Self {
            revalidators,
            categories,
        }
    }

    pub async fn after_mutation(&self, event: &ContentEvent) -> RevalidationReport {
        let plan = self.plan(event).await;
        info!(
            target: TARGET,
            collection = %event.collection(),
            operation = %event.operation,
            document = %event.snapshot.label(),
            steps = plan.len(),
            "running revalidation hooks"
        );
        self.execute(plan).await
    }

    pub async fn plan(&self, event: &ContentEvent) -> RevalidationPlan {
        let previous = event.previous.as_ref();
        match &event.snapshot {
            DocumentSnapshot::Category { slug, .. } => {
                if event.is_delete() {
                    RevalidationPlan::category_deleted(slug)
                } else {
                    let previous_slug = match previous {
                        Some(DocumentSnapshot::Category { slug, .. }) => Some(slug.as_str()),
                        _ => None,
                    };
                    RevalidationPlan::category_changed(slug, previous_slug)
                }
            }
            DocumentSnapshot::Post {
                slug, category_id, ..
            } => {
                let current = self.post_location(slug, *category_id, event.locale).await;
                if event.is_delete() {
                    return RevalidationPlan::post_deleted(current.as_ref());
                }
                let previous = match previous {
                    Some(DocumentSnapshot::Post {
                        slug, category_id, ..
                    }) => self.post_location(slug, *category_id, event.locale).await,
                    _ => None,
                };
                RevalidationPlan::post_changed(current.as_ref(), previous.as_ref())
            }
            DocumentSnapshot::Page { url, .. } => {
                let previous_url = match previous {
                    Some(DocumentSnapshot::Page { url, .. }) => url.as_deref(),
                    _ => None,
                };
                RevalidationPlan::page_changed(url.as_deref().into_iter().chain(previous_url))
            }
            DocumentSnapshot::Partner { slug, .. } => {
                let previous_slug = match previous {
                    Some(DocumentSnapshot::Partner { slug, .. }) => Some(slug.as_str()),
                    _ => None,
                };
                RevalidationPlan::partner_changed(std::iter::once(slug.as_str()).chain(previous_slug))
            }
            DocumentSnapshot::CaseStudy { slug, .. } => {
                let previous_slug = match previous {
                    Some(DocumentSnapshot::CaseStudy { slug, .. }) => Some(slug.as_str()),
                    _ => None,
                };
                RevalidationPlan::case_study_changed(
                    std::iter::once(slug.as_str()).chain(previous_slug),
                )
            }
            DocumentSnapshot::Form { title, .. } => {
                let previous_title = match previous {
                    Some(DocumentSnapshot::Form { title, .. }) => Some(title.as_str()),
                    _ => None,
                };
                RevalidationPlan::form_changed(std::iter::once(title.as_str()).chain(previous_title))
            }
            DocumentSnapshot::Global { .. } => RevalidationPlan::global_changed(),
            DocumentSnapshot::Redirect { .. } => RevalidationPlan::redirect_changed(),
        }
    }

    /// Run every step against every revalidator, sequentially.
    pub async fn execute(&self, plan: RevalidationPlan) -> RevalidationReport {
        let mut applied = 0;
        let mut failed = 0;

        for step in plan.steps() {
            for revalidator in &self.revalidators {
                let result = match step {
                    Invalidation::Path(path) => revalidator.revalidate_path(path).await,
                    Invalidation::Tag(tag) => revalidator.revalidate_tag(tag).await,
                };
                match result {
                    Ok(()) => {
                        applied += 1;
                        counter!(
                            "safecircle_revalidations_total",
                            "target" => revalidator.name(),
                            "outcome" => "ok"
                        )
                        .increment(1);
                    }
                    Err(error) => {
                        failed += 1;
                        counter!(
                            "safecircle_revalidations_total",
                            "target" => revalidator.name(),
                            "outcome" => "error"
                        )
                        .increment(1);
                        warn!(
                            target: TARGET,
                            revalidator = revalidator.name(),
                            step = %step,
                            error = %error,
                            "revalidation step failed"
                        );
                    }
                }
            }
            if let Invalidation::Path(path) = step {
                info!(target: TARGET, "Revalidated: {path}");
            }
        }

        RevalidationReport {
            plan,
            applied,
            failed,
        }
    }

    async fn post_location(
        &self,
        slug: &str,
        category_id: Option<Uuid>,
        locale: Locale,
    ) -> Option<PostLocation> {
        let category_id = category_id?;
        match self.categories.find_category_by_id(category_id, locale).await {
            Ok(Some(category)) => Some(PostLocation::new(category.slug, slug)),
            Ok(None) => {
                warn!(target: TARGET, %category_id, "post category no longer exists");
                None
            }
            Err(error) => {
                warn!(target: TARGET, %category_id, error = %error, "post category lookup failed");
                None
            }
        }
    }
}
