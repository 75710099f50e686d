use super::llm::{ChatModel, parse_json_answer};
use crate::error::ClassifierError;
use crate::results::LinkInfo;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Scores links in fixed-size batches and keeps the ones unlikely to be noise.
///
/// Answers are matched to the submitted links by position only. A batch that
/// cannot be classified is kept whole.
pub struct NoiseClassifier {
    model: Arc<dyn ChatModel>,
    prompt: Arc<str>,
    threshold: f64,
    batch_size: usize,
}

#[derive(Serialize)]
struct BatchPayload<'a> {
    links: &'a [LinkInfo],
}

impl NoiseClassifier {
    pub fn new(model: Arc<dyn ChatModel>, prompt: &str, threshold: f64, batch_size: usize) -> Self {
        Self {
            model,
            prompt: Arc::from(prompt),
            threshold,
            batch_size: batch_size.max(1),
        }
    }

    /// Classify all `links`; batches are submitted concurrently and the
    /// surviving links come back in their original order.
    pub async fn classify(&self, links: Vec<LinkInfo>) -> Vec<LinkInfo> {
        if links.is_empty() {
            return links;
        }

        let mut batches = JoinSet::new();
        for (index, batch) in links.chunks(self.batch_size).enumerate() {
            let batch = batch.to_vec();
            let model = Arc::clone(&self.model);
            let prompt = Arc::clone(&self.prompt);
            let threshold = self.threshold;
            batches.spawn(async move {
                let kept = classify_batch(model.as_ref(), &prompt, threshold, index, batch).await;
                (index, kept)
            });
        }

        let mut results: Vec<Option<Vec<LinkInfo>>> = vec![None; batches.len()];
        while let Some(joined) = batches.join_next().await {
            match joined {
                Ok((index, kept)) => results[index] = Some(kept),
                Err(e) => ::log::error!("Noise classification task failed: {}", e),
            }
        }

        // A batch whose task died is kept unfiltered.
        let kept: Vec<LinkInfo> = results
            .into_iter()
            .zip(links.chunks(self.batch_size))
            .flat_map(|(kept, batch)| kept.unwrap_or_else(|| batch.to_vec()))
            .collect();
        ::log::debug!("Noise classifier kept {} of {} links", kept.len(), links.len());
        kept
    }
}

async fn classify_batch(
    model: &dyn ChatModel,
    prompt: &str,
    threshold: f64,
    index: usize,
    batch: Vec<LinkInfo>,
) -> Vec<LinkInfo> {
    match score_batch(model, prompt, &batch).await {
        Ok(scores) => {
            if scores.len() != batch.len() {
                ::log::warn!(
                    "Noise batch {} returned {} scores for {} links, matching by position",
                    index + 1,
                    scores.len(),
                    batch.len()
                );
            }
            batch
                .into_iter()
                .zip(scores)
                .filter(|(_, confidence)| *confidence <= threshold)
                .map(|(link, _)| link)
                .collect()
        }
        Err(e) => {
            ::log::warn!(
                "Noise batch {} could not be classified, keeping all {} links: {}",
                index + 1,
                batch.len(),
                e
            );
            batch
        }
    }
}

/// Noise confidence per returned entry; entries without a confidence count as noise.
async fn score_batch(
    model: &dyn ChatModel,
    prompt: &str,
    batch: &[LinkInfo],
) -> Result<Vec<f64>, ClassifierError> {
    let payload = serde_json::to_string(&BatchPayload { links: batch })
        .map_err(|e| ClassifierError::Malformed(e.to_string()))?;
    let answer = model.complete(prompt, &payload).await?;
    let value = parse_json_answer(&answer)?;

    let entries = value
        .get("links")
        .and_then(|links| links.as_array())
        .ok_or_else(|| ClassifierError::Malformed("answer has no `links` array".to_string()))?;

    Ok(entries
        .iter()
        .map(|entry| {
            entry
                .get("confidence")
                .and_then(|c| c.as_f64())
                .unwrap_or(1.0)
        })
        .collect())
}
