//! Topic mentions, the one unchained fact table.
//!
//! Topic keys come from an external extractor. A mention ties a paragraph to
//! a key; topics are deduplicated by key and keep a running mention count.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
  pub key:      String,
  pub mentions: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMention {
  pub apara_id:  i32,
  pub topic_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct TopicTable {
  counts:  BTreeMap<String, u32>,
  /// Keys per paragraph, in the order they were mentioned.
  by_para: HashMap<i32, Vec<String>>,
}

impl TopicTable {
  pub fn contains(&self, mention: &TopicMention) -> bool {
    self
      .by_para
      .get(&mention.apara_id)
      .is_some_and(|keys| keys.contains(&mention.topic_key))
  }

  /// Record a mention and return the topic with its updated count.
  pub(crate) fn insert(&mut self, mention: &TopicMention) -> Topic {
    let count = self.counts.entry(mention.topic_key.clone()).or_default();
    *count += 1;
    self
      .by_para
      .entry(mention.apara_id)
      .or_default()
      .push(mention.topic_key.clone());
    Topic { key: mention.topic_key.clone(), mentions: *count }
  }

  pub fn topic(&self, key: &str) -> Option<Topic> {
    self
      .counts
      .get(key)
      .map(|&mentions| Topic { key: key.to_owned(), mentions })
  }

  /// Topics mentioned by `apara_id`; empty if none.
  pub fn for_paragraph(&self, apara_id: i32) -> Vec<Topic> {
    self
      .by_para
      .get(&apara_id)
      .into_iter()
      .flatten()
      .filter_map(|key| self.topic(key))
      .collect()
  }

  pub fn has_mentions(&self, apara_id: i32) -> bool {
    self.by_para.contains_key(&apara_id)
  }

  /// All topics, most mentioned first.
  pub fn ranked(&self) -> Vec<Topic> {
    let mut topics: Vec<Topic> = self
      .counts
      .iter()
      .map(|(key, &mentions)| Topic { key: key.clone(), mentions })
      .collect();
    topics.sort_by(|a, b| b.mentions.cmp(&a.mentions).then_with(|| a.key.cmp(&b.key)));
    topics
  }
}
