use model::{core::value::join_values, records::hit::Hit, records::row::Row};

/// Flattens a hit: metadata columns plus one joined string per field.
pub fn map_hit(hit: Hit) -> Row {
    let mut row = Row::new(hit.index, hit.id, hit.score);
    if let Some(fields) = hit.fields {
        for (name, values) in fields {
            let joined = join_values(&values);
            row.push_field(name, joined);
        }
    }
    row
}

/// Maps hits lazily, one row per hit, in page order.
pub fn map_hits<I>(hits: I) -> impl Iterator<Item = Row>
where
    I: IntoIterator<Item = Hit>,
{
    hits.into_iter().map(map_hit)
}
