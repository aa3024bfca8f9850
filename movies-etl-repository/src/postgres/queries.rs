//! SQL templates for change extraction.
//!
//! Every query takes the same three parameters:
//!
//! - `$1` - watermark timestamp (`timestamptz`)
//! - `$2` - watermark tie-break id (`uuid`, nil when unknown)
//! - `$3` - batch size (`bigint`)
//!
//! and returns rows strictly after `($1, $2)` in `(modified, id)` order.

use movies_etl_shared::Stream;

/// Film works with genres and cast aggregated per role.
///
/// Outer joins keep works without genres or cast; the `FILTER` clauses drop
/// the all-null objects those joins would otherwise aggregate.
const FILM_WORK_QUERY: &str = "
SELECT
    fw.id,
    fw.title,
    fw.description,
    fw.rating,
    fw.type,
    fw.premium,
    fw.modified,
    COALESCE(
        JSON_AGG(DISTINCT JSONB_BUILD_OBJECT('id', g.id, 'name', g.name))
            FILTER (WHERE g.id IS NOT NULL),
        '[]'
    ) AS genres,
    COALESCE(
        JSON_AGG(DISTINCT JSONB_BUILD_OBJECT('id', p.id, 'name', p.full_name))
            FILTER (WHERE p.id IS NOT NULL AND pfw.role = 'actor'),
        '[]'
    ) AS actors,
    COALESCE(
        JSON_AGG(DISTINCT JSONB_BUILD_OBJECT('id', p.id, 'name', p.full_name))
            FILTER (WHERE p.id IS NOT NULL AND pfw.role = 'director'),
        '[]'
    ) AS directors,
    COALESCE(
        JSON_AGG(DISTINCT JSONB_BUILD_OBJECT('id', p.id, 'name', p.full_name))
            FILTER (WHERE p.id IS NOT NULL AND pfw.role = 'writer'),
        '[]'
    ) AS writers
FROM film_work AS fw
LEFT JOIN genre_film_work AS gfw ON gfw.film_work_id = fw.id
LEFT JOIN genre AS g ON g.id = gfw.genre_id
LEFT JOIN person_film_work AS pfw ON pfw.film_work_id = fw.id
LEFT JOIN person AS p ON p.id = pfw.person_id
WHERE (fw.modified, fw.id) > ($1, $2)
GROUP BY fw.id
ORDER BY fw.modified, fw.id
LIMIT $3";

const GENRE_QUERY: &str = "
SELECT g.id, g.name, g.description, g.modified
FROM genre AS g
WHERE (g.modified, g.id) > ($1, $2)
ORDER BY g.modified, g.id
LIMIT $3";

const PERSON_QUERY: &str = "
SELECT p.id, p.full_name AS name, p.modified
FROM person AS p
WHERE (p.modified, p.id) > ($1, $2)
ORDER BY p.modified, p.id
LIMIT $3";

/// Extraction query for a stream.
pub fn changed_rows_query(stream: Stream) -> &'static str {
    match stream {
        Stream::FilmWork => FILM_WORK_QUERY,
        Stream::Genre => GENRE_QUERY,
        Stream::Person => PERSON_QUERY,
    }
}
