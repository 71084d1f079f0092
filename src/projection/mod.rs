//! Latent-space projection of a query against its references and the corpus.
//!
//! [`LatentProjector::project`] assembles the background sample, the
//! retrieved references, and the query vector into one matrix, standardizes
//! it, and reduces it to three principal components. Both fits are redone on
//! every call: the basis depends on the current point set and can rotate or
//! flip between calls.

pub mod pca;

use ndarray::Array2;
use serde::Serialize;

use crate::error::PipelineError;
use crate::retrieval::background::BackgroundSample;
use crate::retrieval::QueryContext;

/// Output dimensionality.
pub const COMPONENTS: usize = 3;

/// Fewer points than this and a 3-D reduction is meaningless.
pub const MIN_POINTS: usize = 3;

pub const BACKGROUND_LABEL: &str = "Latent Background";
pub const QUERY_LABEL: &str = "Your Vision";

/// Which group a projected point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointCategory {
    /// A vector from the background sample.
    Background,
    /// A retrieved reference document.
    Reference,
    /// The live query.
    Query,
}

impl PointCategory {
    /// Marker size. The query is largest so it reads on top of its references.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Background => 3.0,
            Self::Reference => 10.0,
            Self::Query => 15.0,
        }
    }

    /// Legend name for the group.
    pub fn group(&self) -> &'static str {
        match self {
            Self::Background => "Universe",
            Self::Reference => "Memory",
            Self::Query => "Sensation",
        }
    }

    /// Display color as a hex string.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Background => "#2c2f33",
            Self::Reference => "#0068C9",
            Self::Query => "#FF4B4B",
        }
    }
}

/// One point of the 3-D cloud.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedPoint {
    pub coordinates: (f64, f64, f64),
    pub label: String,
    pub category: PointCategory,
    pub weight: f64,
}

struct TaggedVector<'a> {
    vector: &'a [f32],
    label: &'a str,
    category: PointCategory,
}

/// Stateless projector; holds no fitted transform between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatentProjector;

impl LatentProjector {
    pub fn new() -> Self {
        Self
    }

    /// Project background, references, and query into three dimensions.
    ///
    /// Returns `Ok(None)` when there is nothing meaningful to draw: the query
    /// context is degraded or fewer than [`MIN_POINTS`] vectors were
    /// assembled. Vectors of differing widths are a fatal
    /// [`PipelineError::DimensionMismatch`].
    pub fn project(
        &self,
        background: &BackgroundSample,
        context: &QueryContext,
    ) -> Result<Option<Vec<ProjectedPoint>>, PipelineError> {
        if context.is_degraded() {
            tracing::debug!("query context degraded, nothing to project");
            return Ok(None);
        }

        let tagged = assemble(background, context);
        if tagged.len() < MIN_POINTS {
            tracing::debug!(points = tagged.len(), "too few points to project");
            return Ok(None);
        }

        let dims = context.dimensions();
        if let Some(bad) = tagged.iter().find(|t| t.vector.len() != dims) {
            return Err(PipelineError::DimensionMismatch {
                context: "projection input",
                expected: dims,
                actual: bad.vector.len(),
            });
        }

        let data = Array2::from_shape_fn((tagged.len(), dims), |(i, j)| {
            f64::from(tagged[i].vector[j])
        });
        let standardized = pca::standardize(&data);
        let scores = pca::principal_components(&standardized, COMPONENTS);

        let points = tagged
            .iter()
            .enumerate()
            .map(|(i, t)| ProjectedPoint {
                coordinates: (scores[[i, 0]], scores[[i, 1]], scores[[i, 2]]),
                label: t.label.to_string(),
                category: t.category,
                weight: t.category.weight(),
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            background = background.len(),
            references = context.references.len(),
            points = points.len(),
            "projection complete"
        );
        Ok(Some(points))
    }
}

/// Background first, references in rank order, query last so it is drawn on
/// top.
fn assemble<'a>(
    background: &'a BackgroundSample,
    context: &'a QueryContext,
) -> Vec<TaggedVector<'a>> {
    let mut tagged = Vec::with_capacity(background.len() + context.references.len() + 1);
    tagged.extend(background.vectors().iter().map(|v| TaggedVector {
        vector: v,
        label: BACKGROUND_LABEL,
        category: PointCategory::Background,
    }));
    tagged.extend(context.references.iter().map(|r| TaggedVector {
        vector: &r.vector,
        label: &r.title,
        category: PointCategory::Reference,
    }));
    tagged.push(TaggedVector {
        vector: &context.query_vector,
        label: QUERY_LABEL,
        category: PointCategory::Query,
    });
    tagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::ReferenceDocument;

    fn reference(title: &str, vector: Vec<f32>) -> ReferenceDocument {
        ReferenceDocument {
            id: title.to_lowercase(),
            vector,
            text: String::new(),
            title: title.into(),
            score: 0.5,
        }
    }

    fn context(query: Vec<f32>, references: Vec<ReferenceDocument>) -> QueryContext {
        QueryContext {
            narrative: "A Serene poem about Nature.".into(),
            query_vector: query,
            references,
        }
    }

    #[test]
    fn fewer_than_three_points_is_none() {
        let ctx = context(vec![1.0, 0.0, 0.0], vec![reference("One", vec![0.0, 1.0, 0.0])]);
        let result = LatentProjector::new()
            .project(&BackgroundSample::empty(), &ctx)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn degraded_context_is_none() {
        let background = BackgroundSample::new(vec![vec![1.0, 2.0]; 10]);
        let result = LatentProjector::new()
            .project(&background, &QueryContext::degraded("x"))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn assembly_order_and_encoding() {
        let background = BackgroundSample::new(vec![vec![0.0, 1.0, 2.0], vec![2.0, 1.0, 0.0]]);
        let ctx = context(
            vec![1.0, 1.0, 1.0],
            vec![
                reference("Poem 1", vec![0.5, 0.2, 0.9]),
                reference("Poem 2", vec![0.1, 0.8, 0.3]),
            ],
        );
        let points = LatentProjector::new()
            .project(&background, &ctx)
            .unwrap()
            .expect("five points project");

        assert_eq!(points.len(), 5);
        let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![BACKGROUND_LABEL, BACKGROUND_LABEL, "Poem 1", "Poem 2", QUERY_LABEL]
        );
        assert_eq!(points[0].weight, 3.0);
        assert_eq!(points[2].weight, 10.0);
        assert_eq!(points[4].weight, 15.0);
        assert_eq!(points[4].category, PointCategory::Query);
    }

    #[test]
    fn mixed_widths_are_fatal() {
        let background = BackgroundSample::new(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        let ctx = context(vec![1.0, 1.0, 1.0], vec![]);
        let err = LatentProjector::new().project(&background, &ctx).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            PipelineError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn category_encoding_is_stable() {
        assert_eq!(PointCategory::Background.group(), "Universe");
        assert_eq!(PointCategory::Reference.group(), "Memory");
        assert_eq!(PointCategory::Query.group(), "Sensation");
        assert_eq!(PointCategory::Query.color(), "#FF4B4B");
        let json = serde_json::to_value(PointCategory::Reference).unwrap();
        assert_eq!(json, "reference");
    }
}
