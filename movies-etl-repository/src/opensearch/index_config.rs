//! OpenSearch index configuration and mappings.
//!
//! This module defines the settings and mappings of the three catalog
//! indices. All of them share the same analysis chain so that the read
//! service can search Russian and English text the same way everywhere.

use serde_json::{json, Value};

use movies_etl_shared::Stream;

/// Get the full index body (settings and mappings) for a stream's index.
pub fn index_settings(stream: Stream) -> Value {
    let mappings = match stream {
        Stream::FilmWork => movies_mappings(),
        Stream::Genre => genres_mappings(),
        Stream::Person => persons_mappings(),
    };

    json!({
        "settings": analysis_settings(),
        "mappings": mappings
    })
}

/// Shared settings with the `ru_en` analyzer.
///
/// - Lowercasing plus English and Russian stop words
/// - English possessive stemmer and light stemmers for both languages
fn analysis_settings() -> Value {
    json!({
        "refresh_interval": "1s",
        "analysis": {
            "filter": {
                "english_stop": {
                    "type": "stop",
                    "stopwords": "_english_"
                },
                "english_stemmer": {
                    "type": "stemmer",
                    "language": "english"
                },
                "english_possessive_stemmer": {
                    "type": "stemmer",
                    "language": "possessive_english"
                },
                "russian_stop": {
                    "type": "stop",
                    "stopwords": "_russian_"
                },
                "russian_stemmer": {
                    "type": "stemmer",
                    "language": "russian"
                }
            },
            "analyzer": {
                "ru_en": {
                    "tokenizer": "standard",
                    "filter": [
                        "lowercase",
                        "english_stop",
                        "english_stemmer",
                        "english_possessive_stemmer",
                        "russian_stop",
                        "russian_stemmer"
                    ]
                }
            }
        }
    })
}

/// `{id, name}` stub nested inside a film document.
fn nested_entity() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": { "type": "keyword" },
            "name": { "type": "text", "analyzer": "ru_en" }
        }
    })
}

fn text_with_raw() -> Value {
    json!({
        "type": "text",
        "analyzer": "ru_en",
        "fields": {
            "raw": { "type": "keyword" }
        }
    })
}

fn movies_mappings() -> Value {
    json!({
        "dynamic": "strict",
        "properties": {
            "id": { "type": "keyword" },
            "imdb_rating": { "type": "float" },
            "type": { "type": "keyword" },
            "premium": { "type": "boolean" },
            "title": text_with_raw(),
            "description": { "type": "text", "analyzer": "ru_en" },
            "genres": nested_entity(),
            "actors": nested_entity(),
            "directors": nested_entity(),
            "writers": nested_entity()
        }
    })
}

fn genres_mappings() -> Value {
    json!({
        "dynamic": "strict",
        "properties": {
            "id": { "type": "keyword" },
            "name": text_with_raw(),
            "description": { "type": "text", "analyzer": "ru_en" }
        }
    })
}

fn persons_mappings() -> Value {
    json!({
        "dynamic": "strict",
        "properties": {
            "id": { "type": "keyword" },
            "name": text_with_raw()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_structure() {
        for stream in Stream::ALL {
            let settings = index_settings(stream);

            assert!(settings["settings"]["analysis"]["analyzer"]["ru_en"].is_object());
            assert_eq!(settings["mappings"]["dynamic"], "strict");
            assert_eq!(settings["mappings"]["properties"]["id"]["type"], "keyword");
        }
    }

    #[test]
    fn test_movies_nested_fields() {
        let settings = index_settings(Stream::FilmWork);
        let properties = &settings["mappings"]["properties"];

        for field in ["genres", "actors", "directors", "writers"] {
            assert_eq!(properties[field]["type"], "nested");
            assert_eq!(properties[field]["properties"]["id"]["type"], "keyword");
        }
        assert_eq!(properties["imdb_rating"]["type"], "float");
        assert_eq!(properties["premium"]["type"], "boolean");
        assert_eq!(properties["title"]["fields"]["raw"]["type"], "keyword");
    }

    #[test]
    fn test_mappings_match_document_fields() {
        let genres = index_settings(Stream::Genre);
        assert!(genres["mappings"]["properties"]["description"].is_object());

        let persons = index_settings(Stream::Person);
        let properties = persons["mappings"]["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 2);
        assert!(properties.contains_key("name"));
    }
}
