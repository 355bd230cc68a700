// src/services/analytics_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    common::error::{AggregationError, AppError},
    models::{
        analytics::{AnalyticsReport, ProductPerformance, StatusPolicy},
        sale::{totals_from_items, SaleDetail, SaleItem, SaleStatus},
    },
};

/// Origem das vendas de um período. O `SaleRepository` é a implementação real.
#[async_trait]
pub trait SaleSource: Send + Sync {
    /// Vendas com `created_at` em `[start, end]` (inclusivo), da mais recente para a mais antiga.
    async fn sales_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SaleDetail>, AppError>;
}

#[derive(Clone)]
pub struct AnalyticsService {
    source: Arc<dyn SaleSource>,
}

impl AnalyticsService {
    pub fn new(source: Arc<dyn SaleSource>) -> Self {
        Self { source }
    }

    pub async fn report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        policy: StatusPolicy,
    ) -> Result<AnalyticsReport, AppError> {
        if start > end {
            return Err(AppError::InvalidDateRange);
        }

        let sales = self.source.sales_between(start, end).await?;
        tracing::debug!(count = sales.len(), %start, %end, "Vendas carregadas para o relatório");

        Ok(compute_analytics(&sales, policy)?)
    }
}

// ---
// Agregação (pura)
// ---

pub fn compute_analytics(
    sales: &[SaleDetail],
    policy: StatusPolicy,
) -> Result<AnalyticsReport, AggregationError> {
    let mut total_sales = Decimal::ZERO;
    let mut total_profit = Decimal::ZERO;
    let mut sales_count = 0usize;
    let mut by_sku: HashMap<String, ProductPerformance> = HashMap::new();

    for detail in sales.iter().filter(|d| is_included(d.sale.status, policy)) {
        for item in &detail.items {
            check_item(detail, item)?;
        }

        // Os totais do período somam o que foi gravado na venda; os itens são
        // recalculados à parte e qualquer divergência fica registrada no log.
        let (items_total, items_profit) = totals_from_items(&detail.items);
        if items_total != detail.sale.total || items_profit != detail.sale.profit {
            tracing::warn!(
                sale_id = %detail.sale.id,
                stored_total = %detail.sale.total,
                items_total = %items_total,
                stored_profit = %detail.sale.profit,
                items_profit = %items_profit,
                "Totais gravados divergem da soma dos itens"
            );
        }

        total_sales += detail.sale.total;
        total_profit += detail.sale.profit;
        sales_count += 1;

        for item in &detail.items {
            // O nome da primeira ocorrência do SKU prevalece.
            let row = by_sku.entry(item.sku.clone()).or_insert_with(|| ProductPerformance {
                name: item.name.clone(),
                sku: item.sku.clone(),
                quantity: 0,
                revenue: Decimal::ZERO,
                profit: Decimal::ZERO,
            });

            row.quantity += i64::from(item.quantity);
            row.revenue += item.line_revenue();
            row.profit += item.line_profit();
        }
    }

    let profit_margin = if total_sales > Decimal::ZERO {
        total_profit * Decimal::ONE_HUNDRED / total_sales
    } else {
        Decimal::ZERO
    };

    let mut product_performance: Vec<ProductPerformance> = by_sku.into_values().collect();
    product_performance.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.sku.cmp(&b.sku)));

    Ok(AnalyticsReport {
        total_sales,
        total_profit,
        profit_margin,
        sales_count,
        product_performance,
    })
}

fn is_included(status: SaleStatus, policy: StatusPolicy) -> bool {
    match policy {
        StatusPolicy::All => true,
        StatusPolicy::Completed => status == SaleStatus::Completed,
    }
}

fn check_item(detail: &SaleDetail, item: &SaleItem) -> Result<(), AggregationError> {
    let reason = if item.sku.trim().is_empty() {
        Some("SKU vazio")
    } else if item.quantity < 0 {
        Some("quantidade negativa")
    } else if item.cost_price < Decimal::ZERO {
        Some("preço de custo negativo")
    } else if item.selling_price < Decimal::ZERO {
        Some("preço de venda negativo")
    } else if item.actual_selling_price < Decimal::ZERO {
        Some("preço cobrado negativo")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AggregationError::MalformedSaleItem {
            sale_id: detail.sale.id,
            sku: item.sku.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sale::Sale;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(sku: &str, name: &str, quantity: i32, cost: &str, actual: &str) -> SaleItem {
        SaleItem {
            sale_id: Uuid::nil(),
            product_id: Uuid::new_v4(),
            variant_id: Uuid::new_v4(),
            name: name.into(),
            sku: sku.into(),
            quantity,
            cost_price: dec(cost),
            selling_price: dec(actual),
            actual_selling_price: dec(actual),
        }
    }

    fn sale(status: SaleStatus, items: Vec<SaleItem>) -> SaleDetail {
        let (total, profit) = totals_from_items(&items);
        let now = Utc::now();
        SaleDetail {
            sale: Sale {
                id: Uuid::new_v4(),
                customer: None,
                total,
                profit,
                status,
                created_at: now,
                updated_at: now,
            },
            items,
        }
    }

    fn row<'a>(report: &'a AnalyticsReport, sku: &str) -> &'a ProductPerformance {
        report
            .product_performance
            .iter()
            .find(|r| r.sku == sku)
            .unwrap_or_else(|| panic!("sem linha para {sku}"))
    }

    #[test]
    fn empty_input_gives_zeroed_report() {
        let report = compute_analytics(&[], StatusPolicy::All).unwrap();
        assert_eq!(report, AnalyticsReport::empty());
    }

    #[test]
    fn brake_pads_and_oil_filter_scenario() {
        let mut pos_sale = sale(
            SaleStatus::Completed,
            vec![
                item("BP-FRONT-001", "Pastilha Dianteira", 4, "25", "45"),
                item("OF-001", "Filtro de Óleo", 1, "5", "12"),
            ],
        );
        // Totais como vieram gravados do PDV.
        pos_sale.sale.total = dec("242.00");
        pos_sale.sale.profit = dec("98.00");

        let report = compute_analytics(&[pos_sale], StatusPolicy::Completed).unwrap();

        assert_eq!(report.total_sales, dec("242.00"));
        assert_eq!(report.total_profit, dec("98.00"));
        assert_eq!(report.profit_margin.round_dp(2), dec("40.50"));
        assert_eq!(report.sales_count, 1);
        assert_eq!(report.product_performance.len(), 2);

        let pads = row(&report, "BP-FRONT-001");
        assert_eq!(pads.name, "Pastilha Dianteira");
        assert_eq!(pads.quantity, 4);
        assert_eq!(pads.revenue, dec("180"));
        assert_eq!(pads.profit, dec("80"));

        let filter = row(&report, "OF-001");
        assert_eq!(filter.quantity, 1);
        assert_eq!(filter.revenue, dec("12"));
        assert_eq!(filter.profit, dec("7"));
    }

    #[test]
    fn margin_is_zero_without_sales_revenue() {
        // Tudo dado de brinde: total 0, lucro negativo.
        let sales = vec![sale(
            SaleStatus::Completed,
            vec![item("OF-001", "Filtro de Óleo", 2, "5", "0")],
        )];

        let report = compute_analytics(&sales, StatusPolicy::All).unwrap();

        assert_eq!(report.total_sales, Decimal::ZERO);
        assert_eq!(report.total_profit, dec("-10"));
        assert_eq!(report.profit_margin, Decimal::ZERO);
        assert_eq!(report.sales_count, 1);
    }

    #[test]
    fn same_sku_across_sales_collapses_into_one_row() {
        let sales = vec![
            sale(SaleStatus::Completed, vec![item("OF-001", "Filtro de Óleo", 2, "5", "12")]),
            sale(SaleStatus::Completed, vec![item("OF-001", "Filtro Óleo (novo nome)", 3, "5", "11")]),
        ];

        let report = compute_analytics(&sales, StatusPolicy::All).unwrap();

        assert_eq!(report.product_performance.len(), 1);
        let filter = row(&report, "OF-001");
        assert_eq!(filter.quantity, 5);
        assert_eq!(filter.revenue, dec("57"));
        assert_eq!(filter.profit, dec("32"));
        // primeiro nome visto vence
        assert_eq!(filter.name, "Filtro de Óleo");
    }

    #[test]
    fn permuting_sales_does_not_change_totals() {
        let a = sale(
            SaleStatus::Completed,
            vec![
                item("BP-FRONT-001", "Pastilha", 1, "25.10", "45.35"),
                item("OF-001", "Filtro", 3, "5.05", "12.99"),
            ],
        );
        let b = sale(SaleStatus::Completed, vec![item("OF-001", "Filtro", 7, "5.05", "11.49")]);
        let c = sale(SaleStatus::Completed, vec![item("WB-77", "Palheta", 2, "9.90", "19.90")]);

        let forward = compute_analytics(&[a.clone(), b.clone(), c.clone()], StatusPolicy::All).unwrap();
        let backward = compute_analytics(&[c, a, b], StatusPolicy::All).unwrap();

        assert_eq!(forward, backward);
    }

    #[test]
    fn totals_equal_sum_of_stored_totals_when_consistent() {
        let sales = vec![
            sale(SaleStatus::Completed, vec![item("A", "a", 2, "1.5", "3.25")]),
            sale(SaleStatus::Completed, vec![item("B", "b", 1, "10", "14.99")]),
        ];
        let stored_total: Decimal = sales.iter().map(|s| s.sale.total).sum();
        let stored_profit: Decimal = sales.iter().map(|s| s.sale.profit).sum();

        let report = compute_analytics(&sales, StatusPolicy::All).unwrap();

        assert_eq!(report.total_sales, stored_total);
        assert_eq!(report.total_profit, stored_profit);
    }

    #[test]
    fn drifted_stored_totals_do_not_leak_into_product_rows() {
        let mut drifted = sale(SaleStatus::Completed, vec![item("OF-001", "Filtro", 2, "5", "12")]);
        drifted.sale.total = dec("999");
        drifted.sale.profit = dec("1");

        let report = compute_analytics(&[drifted], StatusPolicy::All).unwrap();

        // cabeçalho segue o gravado...
        assert_eq!(report.total_sales, dec("999"));
        assert_eq!(report.total_profit, dec("1"));
        // ...as linhas por SKU saem dos itens
        let filter = row(&report, "OF-001");
        assert_eq!(filter.revenue, dec("24"));
        assert_eq!(filter.profit, dec("14"));
    }

    #[test]
    fn completed_policy_skips_pending_and_refunded() {
        let sales = vec![
            sale(SaleStatus::Completed, vec![item("A", "a", 1, "1", "10")]),
            sale(SaleStatus::Pending, vec![item("B", "b", 1, "1", "20")]),
            sale(SaleStatus::Refunded, vec![item("A", "a", 5, "1", "10")]),
        ];

        let completed = compute_analytics(&sales, StatusPolicy::Completed).unwrap();
        assert_eq!(completed.sales_count, 1);
        assert_eq!(completed.total_sales, dec("10"));
        assert_eq!(completed.product_performance.len(), 1);
        assert_eq!(row(&completed, "A").quantity, 1);

        let all = compute_analytics(&sales, StatusPolicy::All).unwrap();
        assert_eq!(all.sales_count, 3);
        assert_eq!(all.total_sales, dec("80"));
        assert_eq!(row(&all, "A").quantity, 6);
    }

    #[test]
    fn rows_are_ordered_by_revenue_then_sku() {
        let sales = vec![sale(
            SaleStatus::Completed,
            vec![
                item("B", "b", 1, "1", "10"),
                item("A", "a", 1, "1", "10"),
                item("C", "c", 1, "1", "50"),
            ],
        )];

        let report = compute_analytics(&sales, StatusPolicy::All).unwrap();
        let skus: Vec<&str> = report.product_performance.iter().map(|r| r.sku.as_str()).collect();

        assert_eq!(skus, ["C", "A", "B"]);
    }

    // Comportamento novo: itens inválidos interrompem o relatório em vez de contaminar as somas.
    #[test]
    fn malformed_items_are_rejected() {
        let negative_qty = sale(SaleStatus::Completed, vec![item("OF-001", "Filtro", -1, "5", "12")]);
        let err = compute_analytics(&[negative_qty.clone()], StatusPolicy::All).unwrap_err();
        match err {
            AggregationError::MalformedSaleItem { sale_id, sku, .. } => {
                assert_eq!(sale_id, negative_qty.sale.id);
                assert_eq!(sku, "OF-001");
            }
        }

        let negative_price = sale(SaleStatus::Completed, vec![item("OF-001", "Filtro", 1, "-5", "12")]);
        assert!(compute_analytics(&[negative_price], StatusPolicy::All).is_err());

        let blank_sku = sale(SaleStatus::Completed, vec![item("  ", "Sem código", 1, "5", "12")]);
        assert!(compute_analytics(&[blank_sku], StatusPolicy::All).is_err());
    }

    #[test]
    fn malformed_items_in_excluded_sales_are_ignored() {
        let refunded = sale(SaleStatus::Refunded, vec![item("OF-001", "Filtro", -1, "5", "12")]);
        let report = compute_analytics(&[refunded], StatusPolicy::Completed).unwrap();
        assert_eq!(report, AnalyticsReport::empty());
    }

    // ---
    // AnalyticsService com uma origem em memória
    // ---

    struct FakeSource {
        sales: Vec<SaleDetail>,
        calls: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl SaleSource for FakeSource {
        async fn sales_between(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<SaleDetail>, AppError> {
            self.calls.lock().unwrap().push((start, end));
            Ok(self
                .sales
                .iter()
                .filter(|s| s.sale.created_at >= start && s.sale.created_at <= end)
                .cloned()
                .collect())
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn report_uses_inclusive_window() {
        let mut first = sale(SaleStatus::Completed, vec![item("A", "a", 1, "1", "10")]);
        first.sale.created_at = at(1);
        let mut last = sale(SaleStatus::Completed, vec![item("A", "a", 2, "1", "10")]);
        last.sale.created_at = at(10);
        let mut outside = sale(SaleStatus::Completed, vec![item("A", "a", 100, "1", "10")]);
        outside.sale.created_at = at(11);

        let source = Arc::new(FakeSource {
            sales: vec![first, last, outside],
            calls: Mutex::new(Vec::new()),
        });
        let service = AnalyticsService::new(source.clone());

        let report = service.report(at(1), at(10), StatusPolicy::Completed).await.unwrap();

        assert_eq!(report.sales_count, 2);
        assert_eq!(row(&report, "A").quantity, 3);
        assert_eq!(source.calls.lock().unwrap().as_slice(), &[(at(1), at(10))]);
    }

    #[tokio::test]
    async fn report_rejects_inverted_range_without_querying() {
        let source = Arc::new(FakeSource {
            sales: Vec::new(),
            calls: Mutex::new(Vec::new()),
        });
        let service = AnalyticsService::new(source.clone());

        let err = service.report(at(10), at(1), StatusPolicy::All).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidDateRange));
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn report_surfaces_aggregation_errors() {
        let source = Arc::new(FakeSource {
            sales: vec![{
                let mut s = sale(SaleStatus::Completed, vec![item("A", "a", -3, "1", "10")]);
                s.sale.created_at = at(5);
                s
            }],
            calls: Mutex::new(Vec::new()),
        });
        let service = AnalyticsService::new(source);

        let err = service.report(at(1), at(10), StatusPolicy::All).await.unwrap_err();

        assert!(matches!(err, AppError::Aggregation(_)));
    }
}
