use anyhow::{anyhow, Context, Result};
use budget_core::{
    categories::{BudgetIndex, CategoryMapping, StatementRecord},
    dates::normalize_date,
    money::parse_decimal,
    report::NormalizedTransaction,
};
use encoding_rs::WINDOWS_1251;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const PARSER_NAME: &str = "tcs_parser";

pub const SUPPORTED_CURRENCIES: &[&str] = &["USD", "RUB", "EUR"];

/// Status of a settled (non-refunded, non-declined) operation.
pub const STATUS_OK: &str = "OK";

/// Column captions as exported. Treated as opaque keys, never translated.
pub mod columns {
    pub const OPERATION_DATE: &str = "Дата операции";
    pub const STATUS: &str = "Статус";
    pub const AMOUNT: &str = "Сумма операции";
    pub const CURRENCY: &str = "Валюта операции";
    pub const CATEGORY: &str = "Категория";
    pub const DESCRIPTION: &str = "Описание";
}

/// One row of the semicolon-delimited Tinkoff export.
#[derive(Debug, Clone, Default)]
pub struct TcsRow {
    /// `DD.MM.YYYY HH:MM:SS` as exported.
    pub operation_date: String,
    pub status: String,
    /// Comma-decimal magnitude; expenses are exported as positive numbers.
    pub amount: String,
    pub currency: String,
    pub category: String,
    pub description: String,
}

impl StatementRecord for TcsRow {
    fn raw_category(&self) -> &str {
        &self.category
    }
    fn description(&self) -> &str {
        &self.description
    }
}

/// Built-in raw-category assignment for the Tinkoff export.
pub fn default_mapping() -> CategoryMapping {
    CategoryMapping::new([
        ("Еда работа", vec![]),
        ("Еда магазы", vec!["Супермаркеты"]),
        (
            "Прочее",
            vec![
                "Гос. сборы",
                "Другое",
                "Кино",
                "Книги",
                "Переводы/иб",
                "Развлечения",
                "Разные товары",
                "Финан. услуги",
            ],
        ),
        ("Еда заказ/кафе", vec!["Рестораны", "Фастфуд"]),
        ("Проезд", vec!["Транспорт"]),
        ("Медицина", vec!["Аптеки"]),
        ("Одежда", vec![]),
        ("Покупки в кв", vec![]),
        ("Зубы", vec![]),
        ("Химия", vec!["Красота"]),
        ("Инет, телефоны", vec![]),
        ("Ремонт", vec![]),
        ("КУ", vec![]),
        ("Кошка", vec![]),
        ("Ипотека", vec![]),
        ("Инет+тел", vec![]),
        ("Машина", vec![]),
        ("Квартира", vec![]),
        ("Кем. КУ", vec![]),
        ("Саморазв", vec!["Образование"]),
        ("Отпуск", vec![]),
    ])
}

/// Parses one statement from any byte source.
///
/// The export is UTF-8 from the web UI but Windows-1251 from older desktop
/// exports, so non-UTF-8 input falls back to cp1251.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<Vec<TcsRow>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;

    let decoded = decode_text_lossy(&buf);
    let text = decoded.trim_start_matches('\u{feff}');

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = csv_reader.headers().context("missing CSV headers")?.clone();

    let idx_date = find_col(&headers, columns::OPERATION_DATE)?;
    let idx_status = find_col(&headers, columns::STATUS)?;
    let idx_amount = find_col(&headers, columns::AMOUNT)?;
    let idx_currency = find_col(&headers, columns::CURRENCY)?;
    let idx_category = find_col(&headers, columns::CATEGORY)?;
    let idx_description = find_col(&headers, columns::DESCRIPTION)?;

    let mut out = Vec::new();
    for (row_idx, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("CSV read error at row {}", row_idx + 2))?;
        let field = |idx: usize| record.get(idx).unwrap_or("").to_string();

        out.push(TcsRow {
            operation_date: field(idx_date),
            status: field(idx_status),
            amount: field(idx_amount),
            currency: field(idx_currency),
            category: field(idx_category),
            description: field(idx_description),
        });
    }

    Ok(out)
}

pub fn read_statement<P: AsRef<Path>>(path: P) -> Result<Vec<TcsRow>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot open statement {}", path.display()))?;
    let rows = parse_reader(file).with_context(|| format!("in {}", path.display()))?;
    tracing::debug!(file = %path.display(), rows = rows.len(), "loaded tcs statement");
    Ok(rows)
}

/// Loads several statements, concatenated in the caller-supplied order,
/// keeping only settled (`Статус == OK`) operations.
pub fn load_statements(file_names: &[PathBuf]) -> Result<Vec<TcsRow>> {
    let mut rows = Vec::new();
    for file_name in file_names {
        rows.extend(read_statement(file_name)?);
    }
    rows.retain(|row| row.status == STATUS_OK);
    Ok(rows)
}

/// Keeps operations in the requested currency and projects them to the
/// output shape. Every CSV row is an expense, so the exported positive
/// magnitude is sign-flipped. The input is newest-first, so the result is
/// reversed into ascending chronological order.
pub fn project(
    rows: &[TcsRow],
    currency: &str,
    index: &BudgetIndex,
) -> Result<Vec<NormalizedTransaction>> {
    let mut out = Vec::new();
    for row in rows.iter().filter(|r| r.currency == currency) {
        let value = parse_decimal(&row.amount)
            .with_context(|| format!("bad amount in operation dated '{}'", row.operation_date))?;

        // keep the day part only, the export appends a timestamp
        let day: String = row.operation_date.chars().take(10).collect();

        out.push(NormalizedTransaction {
            date: normalize_date(&day),
            sum: -value,
            category: index.category_for(&row.description).to_string(),
            comment: row.description.clone(),
        });
    }
    out.reverse();
    Ok(out)
}

/// Whole pipeline for one invocation. Unlike the BCS format, the category
/// index is built after the status filter.
pub fn run(
    file_names: &[PathBuf],
    currency: &str,
    mapping: &CategoryMapping,
) -> Result<Vec<NormalizedTransaction>> {
    let rows = load_statements(file_names)?;
    let index = BudgetIndex::build(&rows, mapping);
    project(&rows, currency, &index)
}

fn decode_text_lossy(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = WINDOWS_1251.decode(bytes);
            decoded.into_owned()
        }
    }
}

fn find_col(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| anyhow!("missing column '{}' in CSV header", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Дата операции;Статус;Сумма операции;Валюта операции;Категория;Описание";

    fn statement(lines: &[&str]) -> String {
        let mut text = HEADER.to_string();
        for line in lines {
            text.push('\n');
            text.push_str(line);
        }
        text
    }

    #[test]
    fn test_parse_reader_reads_rows() {
        let text = statement(&[
            "02.01.2021 12:00:00;OK;250,00;RUB;Супермаркеты;Пятерочка",
            "01.01.2021 09:30:00;FAILED;99,00;RUB;Фастфуд;Шаурма",
        ]);
        let rows = parse_reader(text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].operation_date, "02.01.2021 12:00:00");
        assert_eq!(rows[0].amount, "250,00");
        assert_eq!(rows[1].status, "FAILED");
    }

    #[test]
    fn test_parse_reader_missing_column() {
        let text = "Дата операции;Статус\n01.01.2021;OK";
        let err = parse_reader(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Сумма операции"));
    }

    #[test]
    fn test_parse_reader_windows_1251_fallback() {
        let text = statement(&["02.01.2021 12:00:00;OK;250,00;RUB;Супермаркеты;Пятерочка"]);
        let (encoded, _, _) = WINDOWS_1251.encode(&text);
        let rows = parse_reader(encoded.as_ref()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "Супермаркеты");
        assert_eq!(rows[0].description, "Пятерочка");
    }

    #[test]
    fn test_parse_reader_skips_bom() {
        let mut text = "\u{feff}".to_string();
        text.push_str(&statement(&["01.01.2021 09:00:00;OK;10,00;RUB;Другое;X"]));
        let rows = parse_reader(text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].operation_date, "01.01.2021 09:00:00");
    }

    #[test]
    fn test_project_sign_and_date() {
        let rows = vec![TcsRow {
            operation_date: "02.01.2021 12:00:00".to_string(),
            status: STATUS_OK.to_string(),
            amount: "250,00".to_string(),
            currency: "RUB".to_string(),
            category: "Супермаркеты".to_string(),
            description: "Пятерочка".to_string(),
        }];
        let index = BudgetIndex::build(&rows, &default_mapping());
        let txs = project(&rows, "RUB", &index).unwrap();

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].date, "2021-01-02");
        assert_eq!(txs[0].sum, -250.0);
        assert_eq!(txs[0].category, "Еда магазы");
        assert_eq!(txs[0].comment, "Пятерочка");
    }

    #[test]
    fn test_project_filters_currency() {
        let mut rub = TcsRow {
            operation_date: "01.01.2021 10:00:00".to_string(),
            status: STATUS_OK.to_string(),
            amount: "100,00".to_string(),
            currency: "RUB".to_string(),
            category: "Транспорт".to_string(),
            description: "Метро".to_string(),
        };
        let mut usd = rub.clone();
        usd.currency = "USD".to_string();
        usd.description = "Uber".to_string();
        rub.amount = "35,50".to_string();

        let rows = vec![usd, rub];
        let index = BudgetIndex::build(&rows, &default_mapping());
        let txs = project(&rows, "USD", &index).unwrap();

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].comment, "Uber");
    }

    #[test]
    fn test_project_bad_amount_is_fatal() {
        let rows = vec![TcsRow {
            operation_date: "01.01.2021 10:00:00".to_string(),
            status: STATUS_OK.to_string(),
            amount: "12,34,56".to_string(),
            currency: "RUB".to_string(),
            ..Default::default()
        }];
        let index = BudgetIndex::build(&rows, &default_mapping());
        assert!(project(&rows, "RUB", &index).is_err());
    }
}
