use std::cmp::Ordering;

use dubox_application::{Paged, QueryRecord, SortDirection, SortKey, Specification};

/// Executes a specification against records held in memory.
///
/// Mirrors the PostgreSQL translation: nulls sort last ascending and first
/// descending, text compares byte-wise and paged results carry the total
/// count of matching records.
pub fn evaluate<R>(
    records: impl IntoIterator<Item = R>,
    specification: &Specification<R>,
) -> Paged<R>
where
    R: QueryRecord,
{
    let mut matching: Vec<R> = records
        .into_iter()
        .filter(|record| {
            specification
                .criteria()
                .iter()
                .all(|criterion| criterion.matches(record))
        })
        .collect();

    let ordering = specification.ordering();
    if !ordering.is_empty() {
        matching.sort_by(|left, right| compare_records(left, right, &ordering));
    }

    let Some(page) = specification.page() else {
        return Paged::unpaged(matching);
    };

    let total_count = matching.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    let items = matching.into_iter().skip(offset).take(limit).collect();

    Paged::new(items, page, total_count)
}

fn compare_records<R: QueryRecord>(
    left: &R,
    right: &R,
    ordering: &[SortKey<R::Field>],
) -> Ordering {
    for key in ordering {
        let ascending = match (left.field_value(key.field), right.field_value(key.field)) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(left_value), Some(right_value)) => left_value
                .compare(&right_value)
                .unwrap_or(Ordering::Equal),
        };

        let directed = match key.direction {
            SortDirection::Ascending => ascending,
            SortDirection::Descending => ascending.reverse(),
        };

        if directed != Ordering::Equal {
            return directed;
        }
    }

    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use dubox_application::{
        Condition, FilterValue, PagingConfig, QueryEntity, QueryRecord, Specification,
    };

    use super::evaluate;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum ModuleField {
        Serial,
        Floor,
        Finish,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Module {
        serial: i64,
        floor: Option<i64>,
        finish: Option<&'static str>,
    }

    impl QueryEntity for Module {
        type Field = ModuleField;

        fn key_field() -> Self::Field {
            ModuleField::Serial
        }
    }

    impl QueryRecord for Module {
        fn field_value(&self, field: Self::Field) -> Option<FilterValue> {
            match field {
                ModuleField::Serial => Some(self.serial.into()),
                ModuleField::Floor => self.floor.map(FilterValue::from),
                ModuleField::Finish => self.finish.map(FilterValue::from),
            }
        }
    }

    fn module(serial: i64, floor: Option<i64>, finish: Option<&'static str>) -> Module {
        Module {
            serial,
            floor,
            finish,
        }
    }

    fn serials(modules: &[Module]) -> Vec<i64> {
        modules.iter().map(|module| module.serial).collect()
    }

    fn fixture() -> Vec<Module> {
        vec![
            module(4, Some(2), Some("Tiled")),
            module(1, None, Some("painted")),
            module(3, Some(1), None),
            module(2, Some(2), Some("tiled")),
            module(5, Some(1), Some("Raw")),
        ]
    }

    #[test]
    fn ascending_order_puts_nulls_last_and_breaks_ties_by_key() {
        let page = PagingConfig::default().normalize(1, 10);
        let specification = Specification::<Module>::new()
            .order_by(ModuleField::Floor)
            .paginate(page);

        let result = evaluate(fixture(), &specification);

        assert_eq!(serials(&result.items), vec![3, 5, 2, 4, 1]);
        assert_eq!(result.total_count, 5);
    }

    #[test]
    fn descending_order_puts_nulls_first() {
        let specification = Specification::<Module>::new().order_by_descending(ModuleField::Floor);

        let result = evaluate(fixture(), &specification);

        assert_eq!(result.items[0].serial, 1);
        assert_eq!(result.items[1].floor, Some(2));
    }

    #[test]
    fn paging_slices_after_filtering_and_reports_total() {
        let page = PagingConfig::default().normalize(2, 2);
        let specification = Specification::<Module>::new()
            .filter(Condition::is_not_null(ModuleField::Floor))
            .order_by(ModuleField::Serial)
            .paginate(page);

        let result = evaluate(fixture(), &specification);

        assert_eq!(serials(&result.items), vec![4, 5]);
        assert_eq!(result.total_count, 4);
        assert_eq!(result.total_pages, 2);
    }

    #[test]
    fn page_past_the_end_is_empty_but_keeps_total() {
        let page = PagingConfig::default().normalize(9, 2);
        let specification = Specification::<Module>::new().paginate(page);

        let result = evaluate(fixture(), &specification);

        assert!(result.items.is_empty());
        assert_eq!(result.total_count, 5);
    }

    #[test]
    fn search_group_matches_case_insensitively() {
        let specification = Specification::<Module>::new()
            .any_of([
                Condition::contains_text(ModuleField::Finish, "TILE"),
                Condition::equals(ModuleField::Serial, 5_i64),
            ])
            .order_by(ModuleField::Serial);

        let result = evaluate(fixture(), &specification);

        assert_eq!(serials(&result.items), vec![2, 4, 5]);
    }

    #[test]
    fn empty_membership_matches_nothing() {
        let specification = Specification::<Module>::new()
            .filter(Condition::one_of(ModuleField::Serial, Vec::<i64>::new()));

        let result = evaluate(fixture(), &specification);

        assert!(result.items.is_empty());
        assert_eq!(result.total_pages, 0);
    }

    #[test]
    fn same_specification_twice_returns_same_page() {
        let page = PagingConfig::default().normalize(1, 3);
        let specification = Specification::<Module>::new()
            .order_by(ModuleField::Floor)
            .paginate(page);

        let first = evaluate(fixture(), &specification);
        let second = evaluate(fixture().into_iter().rev(), &specification);

        assert_eq!(first, second);
    }
}
