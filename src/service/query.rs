use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::{TimeOffService, log_failure};
use crate::{
    error::AppError,
    model::{
        employee::EmployeeRef,
        time_off::{TimeOffRequest, TimeOffStatus, TimeOffType},
    },
    store::{DateBounds, RecordFilter, RecordQuery, SortDirection, SortField, SortKey},
};

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

const DEFAULT_SORT: SortKey = SortKey::new(SortField::CreatedAt, SortDirection::Desc);

#[derive(Debug, Clone, Default)]
pub struct TimeOffFilter {
    pub status: Option<TimeOffStatus>,
    pub time_off_type: Option<TimeOffType>,
    pub employee: Option<EmployeeRef>,
    pub starts_at: DateBounds,
    pub ends_at: DateBounds,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: u64,
    pub limit: u64,
    pub page: u64,
}

impl PageRequest {
    /// `offset` wins over `page`; `limit` is clamped to `1..=100`.
    pub fn window(&self) -> PageWindow {
        let limit = u64::from(self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT));
        match self.offset {
            Some(offset) => {
                let skip = u64::from(offset);
                PageWindow {
                    skip,
                    limit,
                    page: skip / limit + 1,
                }
            }
            None => {
                let page = u64::from(self.page.unwrap_or(1).max(1));
                PageWindow {
                    skip: (page - 1) * limit,
                    limit,
                    page,
                }
            }
        }
    }
}

/// Parses `field,DIR` pairs separated by `;`. Empty input yields `createdAt DESC`.
pub fn parse_sort(raw: Option<&str>) -> Result<Vec<SortKey>, AppError> {
    let mut keys = Vec::new();
    for pair in raw
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        let (field, direction) = pair
            .split_once(',')
            .ok_or_else(|| AppError::invalid_input(format!("Invalid sort '{pair}', expected field,ASC|DESC")))?;
        let field = field
            .trim()
            .parse::<SortField>()
            .map_err(|_| AppError::invalid_input(format!("Cannot sort by '{}'", field.trim())))?;
        let direction = direction
            .trim()
            .parse::<SortDirection>()
            .map_err(|_| AppError::invalid_input(format!("Invalid sort direction '{}'", direction.trim())))?;
        keys.push(SortKey::new(field, direction));
    }
    if keys.is_empty() {
        keys.push(DEFAULT_SORT);
    }
    Ok(keys)
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeOffPage {
    pub data: Vec<TimeOffRequest>,
    pub count: u64,
    pub total: u64,
    pub page: u64,
    pub page_count: u64,
}

impl TimeOffPage {
    fn empty(window: PageWindow) -> Self {
        Self {
            data: Vec::new(),
            count: 0,
            total: 0,
            page: window.page,
            page_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TypeStats {
    pub time_off_type: TimeOffType,
    pub count: u64,
    pub days: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({
    "status": "Approved",
    "types": [{ "time_off_type": "Annual", "count": 2, "days": 7 }],
    "total_count": 2,
    "total_days": 7
}))]
pub struct StatusStats {
    pub status: TimeOffStatus,
    pub types: Vec<TypeStats>,
    pub total_count: u64,
    pub total_days: u64,
}

impl TimeOffService {
    #[instrument(name = "get_time_offs", skip(self))]
    pub async fn get_time_offs(
        &self,
        filter: TimeOffFilter,
        sort: Vec<SortKey>,
        page: PageRequest,
    ) -> Result<TimeOffPage, AppError> {
        self.list_inner(filter, sort, page)
            .await
            .inspect_err(|e| log_failure("get_time_offs", e))
    }

    async fn list_inner(
        &self,
        filter: TimeOffFilter,
        sort: Vec<SortKey>,
        page: PageRequest,
    ) -> Result<TimeOffPage, AppError> {
        let window = page.window();

        let employee_id = match &filter.employee {
            Some(employee) => match self.resolve_employee(employee).await? {
                Some(found) => Some(found.id),
                None => {
                    debug!(%employee, "Employee filter did not resolve, returning empty page");
                    return Ok(TimeOffPage::empty(window));
                }
            },
            None => None,
        };

        let query = RecordQuery {
            filter: RecordFilter {
                status: filter.status,
                time_off_type: filter.time_off_type,
                employee_id,
                starts_at: filter.starts_at,
                ends_at: filter.ends_at,
            },
            sort: if sort.is_empty() { vec![DEFAULT_SORT] } else { sort },
            skip: window.skip,
            limit: window.limit,
        };
        let (data, total) = self.store.query(&query).await?;

        Ok(TimeOffPage {
            count: data.len() as u64,
            data,
            total,
            page: window.page,
            page_count: total.div_ceil(window.limit),
        })
    }

    /// Groups by status, then by type, summing inclusive-day durations.
    #[instrument(name = "get_time_off_stats", skip(self))]
    pub async fn get_time_off_stats(
        &self,
        employee: Option<&EmployeeRef>,
    ) -> Result<Vec<StatusStats>, AppError> {
        self.stats_inner(employee)
            .await
            .inspect_err(|e| log_failure("get_time_off_stats", e))
    }

    async fn stats_inner(&self, employee: Option<&EmployeeRef>) -> Result<Vec<StatusStats>, AppError> {
        let employee_id = match employee {
            Some(employee) => Some(
                self.resolve_employee(employee)
                    .await?
                    .ok_or_else(|| AppError::not_found("Employee not found"))?
                    .id,
            ),
            None => None,
        };
        let rows = self.store.aggregate(employee_id).await?;

        let stats = TimeOffStatus::iter()
            .filter_map(|status| {
                let mut types: Vec<TypeStats> = rows
                    .iter()
                    .filter(|row| row.status == status && row.count > 0)
                    .map(|row| TypeStats {
                        time_off_type: row.time_off_type,
                        count: row.count,
                        days: row.total_days,
                    })
                    .collect();
                if types.is_empty() {
                    return None;
                }
                types.sort_by_key(|t| t.time_off_type);
                Some(StatusStats {
                    status,
                    total_count: types.iter().map(|t| t.count).sum(),
                    total_days: types.iter().map(|t| t.days).sum(),
                    types,
                })
            })
            .collect();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::time_off::ReviewDecision;
    use crate::service::time_off::{CreateTimeOff, ReviewTimeOff};
    use crate::testing::{date, fixture};

    #[test]
    fn window_defaults_and_clamps() {
        assert_eq!(
            PageRequest::default().window(),
            PageWindow { skip: 0, limit: 10, page: 1 }
        );
        let w = PageRequest { page: Some(3), offset: None, limit: Some(500) }.window();
        assert_eq!(w, PageWindow { skip: 200, limit: 100, page: 3 });
        let w = PageRequest { page: Some(0), offset: None, limit: Some(0) }.window();
        assert_eq!(w, PageWindow { skip: 0, limit: 1, page: 1 });
    }

    #[test]
    fn offset_takes_precedence_over_page() {
        let w = PageRequest { page: Some(5), offset: Some(20), limit: Some(10) }.window();
        assert_eq!(w, PageWindow { skip: 20, limit: 10, page: 3 });
    }

    #[test]
    fn sort_parsing() {
        assert_eq!(parse_sort(None).unwrap(), vec![DEFAULT_SORT]);
        assert_eq!(
            parse_sort(Some("startsAt,ASC; status,desc")).unwrap(),
            vec![
                SortKey::new(SortField::StartsAt, SortDirection::Asc),
                SortKey::new(SortField::Status, SortDirection::Desc),
            ]
        );
        assert!(matches!(parse_sort(Some("password,ASC")), Err(AppError::InvalidInput(_))));
        assert!(parse_sort(Some("startsAt")).is_err());
        assert!(parse_sort(Some("startsAt,UP")).is_err());
    }

    async fn seed(fx: &crate::testing::Fixture) {
        for (employee, start, end, kind) in [
            (1, "2025-01-06", "2025-01-10", TimeOffType::Annual),
            (1, "2025-02-03", "2025-02-03", TimeOffType::Casual),
            (3, "2025-01-13", "2025-01-14", TimeOffType::Sick),
            (2, "2025-03-03", "2025-03-05", TimeOffType::Annual),
        ] {
            fx.service
                .create_time_off(CreateTimeOff {
                    employee: EmployeeRef::Id(employee),
                    time_off_type: kind,
                    starts_at: start.into(),
                    ends_at: end.into(),
                    reason: None,
                })
                .await
                .unwrap();
        }
    }

    #[actix_web::test]
    async fn filters_and_paginates() {
        let fx = fixture();
        seed(&fx).await;

        let page = fx
            .service
            .get_time_offs(
                TimeOffFilter {
                    employee: Some(EmployeeRef::Code("EMP-001".into())),
                    ..Default::default()
                },
                parse_sort(Some("startsAt,ASC")).unwrap(),
                PageRequest { limit: Some(1), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.count, 1);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.data[0].starts_at, date("2025-01-06"));

        let page = fx
            .service
            .get_time_offs(
                TimeOffFilter {
                    starts_at: DateBounds { from: Some(date("2025-01-13")), before: Some(date("2025-03-01")) },
                    ..Default::default()
                },
                Vec::new(),
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }

    #[actix_web::test]
    async fn unresolved_employee_filter_yields_empty_page() {
        let fx = fixture();
        seed(&fx).await;
        let page = fx
            .service
            .get_time_offs(
                TimeOffFilter {
                    employee: Some(EmployeeRef::Code("GHOST".into())),
                    ..Default::default()
                },
                Vec::new(),
                PageRequest { page: Some(2), ..Default::default() },
            )
            .await
            .unwrap();
        assert!(page.data.is_empty());
        assert_eq!((page.total, page.page, page.page_count), (0, 2, 0));
    }

    #[actix_web::test]
    async fn stats_group_by_status_then_type() {
        let fx = fixture();
        seed(&fx).await;
        let first = fx
            .service
            .get_time_offs(
                TimeOffFilter {
                    employee: Some(EmployeeRef::Id(1)),
                    time_off_type: Some(TimeOffType::Annual),
                    ..Default::default()
                },
                Vec::new(),
                PageRequest::default(),
            )
            .await
            .unwrap();
        fx.service
            .review_time_off(
                first.data[0].id,
                &EmployeeRef::Id(2),
                ReviewTimeOff { decision: ReviewDecision::Approved, review_note: None },
            )
            .await
            .unwrap();

        let all = fx.service.get_time_off_stats(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].status, TimeOffStatus::Pending);
        assert_eq!(all[0].total_count, 3);
        assert_eq!(all[0].total_days, 1 + 2 + 3);
        assert_eq!(
            all[0].types.iter().map(|t| t.time_off_type).collect::<Vec<_>>(),
            vec![TimeOffType::Annual, TimeOffType::Sick, TimeOffType::Casual]
        );
        assert_eq!(all[1].status, TimeOffStatus::Approved);
        assert_eq!(all[1].types, vec![TypeStats { time_off_type: TimeOffType::Annual, count: 1, days: 5 }]);

        let mine = fx.service.get_time_off_stats(Some(&EmployeeRef::Id(3))).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].total_days, 2);

        let err = fx
            .service
            .get_time_off_stats(Some(&EmployeeRef::Code("GHOST".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
