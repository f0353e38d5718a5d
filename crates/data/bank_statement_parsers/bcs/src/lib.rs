use anyhow::{anyhow, Context, Result};
use budget_core::{
    categories::{BudgetIndex, CategoryMapping, StatementRecord},
    dates::normalize_date,
    money::parse_money,
    report::NormalizedTransaction,
};
use calamine::{open_workbook_auto, Data, Reader};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const PARSER_NAME: &str = "bcs_parser";

pub const SUPPORTED_CURRENCIES: &[&str] = &["USD", "RUR", "EUR"];

/// Operation type marking an expense in the BCS export.
pub const EXPENSE_OPERATION: &str = "Расходная операция";

/// Column captions as exported. Treated as opaque keys, never translated.
pub mod columns {
    pub const OPERATION_DATE: &str = "Дата совершения операции";
    pub const OPERATION_TYPE: &str = "Тип операции";
    pub const EXPENSE_ITEM: &str = "Статья расходов";
    pub const AMOUNT: &str = "Сумма операции";
    pub const DESCRIPTION: &str = "Описание";
    pub const PAYMENT_PURPOSE: &str = "Назначение платежа";
}

/// One row of the BCS statement sheet, resolved by column caption.
#[derive(Debug, Clone, Default)]
pub struct BcsRow {
    pub operation_date: String,
    pub operation_type: String,
    /// Raw source category ("Статья расходов").
    pub expense_item: String,
    pub description: String,
    pub payment_purpose: String,
    /// Locale-formatted amount string, e.g. `"740,00 RUR (740,00 RUR)"`.
    pub amount: String,
}

impl StatementRecord for BcsRow {
    fn raw_category(&self) -> &str {
        &self.expense_item
    }
    fn description(&self) -> &str {
        &self.description
    }
}

/// Built-in raw-category assignment for the BCS export.
pub fn default_mapping() -> CategoryMapping {
    CategoryMapping::new([
        ("Еда работа", vec![]),
        ("Еда магазы", vec!["Супермаркеты"]),
        ("Прочее", vec!["Сервис"]),
        ("Еда заказ/кафе", vec!["Фастфуд"]),
        ("Проезд", vec!["Такси и Каршеринг", "Транспорт"]),
        ("Медицина", vec!["Аптеки"]),
        ("Одежда", vec![]),
        ("Покупки в кв", vec!["Электроника и ПО", "Дом, Ремонт"]),
        ("Зубы", vec![]),
        ("Химия", vec![]),
        ("Инет, телефоны", vec!["Связь, интернет, ТВ"]),
        ("Ремонт", vec![]),
        ("КУ", vec![]),
        ("Кошка", vec!["Животные"]),
        ("Ипотека", vec![]),
        ("Инет+тел", vec![]),
        ("Машина", vec![]),
        ("Квартира", vec![]),
        ("Кем. КУ", vec![]),
        ("Саморазв", vec![]),
        ("Отпуск", vec![]),
    ])
}

/// Reads one statement workbook: first sheet, header row, data rows.
/// The last row is the totals line and is skipped.
pub fn read_statement<P: AsRef<Path>>(path: P) -> Result<Vec<BcsRow>> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("cannot open workbook {}", path.display()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("no sheets in {}", path.display()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("cannot read sheet '{}' of {}", sheet_name, path.display()))?;

    let rows: Vec<&[Data]> = range.rows().collect();
    let out = parse_rows(&rows).with_context(|| format!("in {}", path.display()))?;

    tracing::debug!(file = %path.display(), rows = out.len(), "loaded bcs statement");
    Ok(out)
}

/// Shapes raw sheet rows into typed records. Row 0 is the header, resolved
/// by column caption; the last row is the totals line and is skipped.
fn parse_rows(rows: &[&[Data]]) -> Result<Vec<BcsRow>> {
    if rows.len() < 2 {
        return Ok(Vec::new());
    }

    let header = column_positions(rows[0]);
    let col = |name: &str| -> Result<usize> {
        header
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("missing column '{}'", name))
    };

    let c_date = col(columns::OPERATION_DATE)?;
    let c_type = col(columns::OPERATION_TYPE)?;
    let c_item = col(columns::EXPENSE_ITEM)?;
    let c_amount = col(columns::AMOUNT)?;
    let c_description = col(columns::DESCRIPTION)?;
    let c_purpose = col(columns::PAYMENT_PURPOSE)?;

    let mut out = Vec::new();
    for row in &rows[1..rows.len() - 1] {
        out.push(BcsRow {
            operation_date: cell_text(row.get(c_date)),
            operation_type: cell_text(row.get(c_type)),
            expense_item: cell_text(row.get(c_item)),
            description: cell_text(row.get(c_description)),
            payment_purpose: cell_text(row.get(c_purpose)),
            amount: cell_text(row.get(c_amount)),
        });
    }

    Ok(out)
}

/// Loads several statements, concatenated in the caller-supplied order.
pub fn load_statements(file_names: &[PathBuf]) -> Result<Vec<BcsRow>> {
    let mut rows = Vec::new();
    for file_name in file_names {
        rows.extend(read_statement(file_name)?);
    }
    Ok(rows)
}

/// Keeps expense operations in the requested currency and projects them to
/// the output shape. The input is newest-first, so the result is reversed
/// into ascending chronological order.
pub fn project(
    rows: &[BcsRow],
    currency: &str,
    index: &BudgetIndex,
) -> Result<Vec<NormalizedTransaction>> {
    let mut out = Vec::new();
    for row in rows.iter().filter(|r| r.operation_type == EXPENSE_OPERATION) {
        let amount = parse_money(&row.amount)
            .with_context(|| format!("bad amount in operation dated '{}'", row.operation_date))?;
        if amount.currency != currency {
            continue;
        }

        let comment = if row.description.is_empty() {
            row.payment_purpose.clone()
        } else {
            row.description.clone()
        };

        out.push(NormalizedTransaction {
            date: normalize_date(&row.operation_date),
            // BCS states expenses as positive magnitudes already
            sum: amount.value,
            category: index.category_for(&row.description).to_string(),
            comment,
        });
    }
    out.reverse();
    Ok(out)
}

/// Whole pipeline for one invocation. The category index is built over ALL
/// loaded rows, not just the expense subset.
pub fn run(
    file_names: &[PathBuf],
    currency: &str,
    mapping: &CategoryMapping,
) -> Result<Vec<NormalizedTransaction>> {
    let rows = load_statements(file_names)?;
    let index = BudgetIndex::build(&rows, mapping);
    project(&rows, currency, &index)
}

fn column_positions(header_row: &[Data]) -> HashMap<String, usize> {
    header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| (cell.to_string().trim().to_string(), idx))
        .collect()
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Float(f)) if f.fract() == 0.0 => format!("{}", *f as i64),
        Some(other) => other.to_string().trim().to_string(),
    }
}
