//! Pipe-delimited records exchanged between store nodes.
//!
//! ```text
//! request   op|customerID|itemID|itemName|date|budget|oldItemID|oldItemPrice|quantity
//! response  success|message|errorCode|newBudget|transactionID|itemPrice|items
//! items     id,name,quantity,price;id,name,quantity,price;...
//! ```
//!
//! Absent text fields are empty strings. Amounts are plain decimals
//! (`5.99`), dates are `ddMMyyyy`. One record is one datagram.

use std::fmt;
use std::str::FromStr;

use common::{CustomerId, ItemId, Money, TradeDate, TransactionId};

use crate::error::{Result, WireError};

/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM_LEN: usize = 65_507;

const FIELD: char = '|';
const ITEM_FIELD: char = ',';
const ITEM_RECORD: char = ';';

const REQUEST_FIELDS: usize = 9;
const RESPONSE_FIELDS: usize = 7;

/// Operation tag of a peer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Purchase,
    Find,
    ExchangeCheck,
    ExchangePrepare,
    ExchangeCommit,
    ExchangeRollback,
    ExchangeReturn,
    ExchangeUndoReturn,
}

impl Operation {
    /// Every operation, in protocol order.
    pub const ALL: [Operation; 8] = [
        Operation::Purchase,
        Operation::Find,
        Operation::ExchangeCheck,
        Operation::ExchangePrepare,
        Operation::ExchangeCommit,
        Operation::ExchangeRollback,
        Operation::ExchangeReturn,
        Operation::ExchangeUndoReturn,
    ];

    /// Tag as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Purchase => "PURCHASE",
            Operation::Find => "FIND",
            Operation::ExchangeCheck => "EXCHANGE_CHECK",
            Operation::ExchangePrepare => "EXCHANGE_PREPARE",
            Operation::ExchangeCommit => "EXCHANGE_COMMIT",
            Operation::ExchangeRollback => "EXCHANGE_ROLLBACK",
            Operation::ExchangeReturn => "EXCHANGE_RETURN",
            Operation::ExchangeUndoReturn => "EXCHANGE_UNDO_RETURN",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| WireError::UnknownOperation(s.to_string()))
    }
}

/// A request sent from one node to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub operation: Operation,
    pub customer_id: Option<CustomerId>,
    pub item_id: Option<ItemId>,
    /// An empty name is written as an empty field, so it decodes as `None`.
    pub item_name: Option<String>,
    pub date: Option<TradeDate>,
    /// The caller's view of the customer's budget.
    pub budget: Money,
    pub old_item_id: Option<ItemId>,
    pub old_item_price: Money,
    pub quantity: u32,
}

impl Request {
    fn empty(operation: Operation) -> Self {
        Self {
            operation,
            customer_id: None,
            item_id: None,
            item_name: None,
            date: None,
            budget: Money::zero(),
            old_item_id: None,
            old_item_price: Money::zero(),
            quantity: 0,
        }
    }

    /// Buy `quantity` units from the item's owner on behalf of a customer.
    pub fn purchase(
        customer: CustomerId,
        item: ItemId,
        date: TradeDate,
        budget: Money,
        quantity: u32,
    ) -> Self {
        Self {
            customer_id: Some(customer),
            item_id: Some(item),
            date: Some(date),
            budget,
            quantity,
            ..Self::empty(Operation::Purchase)
        }
    }

    /// List in-stock items whose name matches, case-insensitively.
    pub fn find(customer: CustomerId, name: impl Into<String>) -> Self {
        Self {
            customer_id: Some(customer),
            item_name: Some(name.into()),
            ..Self::empty(Operation::Find)
        }
    }

    fn exchange(
        operation: Operation,
        customer: CustomerId,
        new_item: ItemId,
        budget: Money,
        old_item: ItemId,
        old_price: Money,
    ) -> Self {
        Self {
            customer_id: Some(customer),
            item_id: Some(new_item),
            budget,
            old_item_id: Some(old_item),
            old_item_price: old_price,
            quantity: 1,
            ..Self::empty(operation)
        }
    }

    /// Read-only feasibility check at the new item's store.
    pub fn exchange_check(
        customer: CustomerId,
        new_item: ItemId,
        budget: Money,
        old_item: ItemId,
        old_price: Money,
    ) -> Self {
        Self::exchange(Operation::ExchangeCheck, customer, new_item, budget, old_item, old_price)
    }

    /// Reserve one unit of the new item.
    pub fn exchange_prepare(
        customer: CustomerId,
        new_item: ItemId,
        budget: Money,
        old_item: ItemId,
        old_price: Money,
    ) -> Self {
        Self::exchange(Operation::ExchangePrepare, customer, new_item, budget, old_item, old_price)
    }

    /// Finalize the reservation and report the customer's new budget.
    pub fn exchange_commit(
        customer: CustomerId,
        new_item: ItemId,
        budget: Money,
        old_item: ItemId,
        old_price: Money,
    ) -> Self {
        Self::exchange(Operation::ExchangeCommit, customer, new_item, budget, old_item, old_price)
    }

    /// Release the reservation and restock the new item.
    pub fn exchange_rollback(customer: CustomerId, new_item: ItemId, old_item: ItemId) -> Self {
        Self::exchange(
            Operation::ExchangeRollback,
            customer,
            new_item,
            Money::zero(),
            old_item,
            Money::zero(),
        )
    }

    /// Restock one unit of the old item at its owner.
    pub fn exchange_return(customer: CustomerId, old_item: ItemId) -> Self {
        Self {
            customer_id: Some(customer),
            item_id: Some(old_item),
            quantity: 1,
            ..Self::empty(Operation::ExchangeReturn)
        }
    }

    /// Take back one unit restocked by a previous return.
    pub fn exchange_undo_return(customer: CustomerId, old_item: ItemId) -> Self {
        Self {
            customer_id: Some(customer),
            item_id: Some(old_item),
            quantity: 1,
            ..Self::empty(Operation::ExchangeUndoReturn)
        }
    }

    /// Renders the record, rejecting text that would corrupt it.
    pub fn encode(&self) -> Result<String> {
        if let Some(name) = &self.item_name
            && name.contains([FIELD, '\n', '\r'])
        {
            return Err(WireError::Delimiter { field: "itemName" });
        }
        check_len(self.render())
    }

    fn render(&self) -> String {
        [
            self.operation.as_str().to_string(),
            opt(&self.customer_id),
            opt(&self.item_id),
            self.item_name.clone().unwrap_or_default(),
            opt(&self.date),
            self.budget.to_decimal(),
            opt(&self.old_item_id),
            self.old_item_price.to_decimal(),
            self.quantity.to_string(),
        ]
        .join("|")
    }

    /// Parses a record.
    pub fn decode(raw: &str) -> Result<Self> {
        let fields: Vec<&str> = raw.split(FIELD).collect();
        if fields.len() != REQUEST_FIELDS {
            return Err(WireError::FieldCount {
                expected: REQUEST_FIELDS,
                found: fields.len(),
            });
        }
        Ok(Self {
            operation: fields[0].parse()?,
            customer_id: parse_opt(fields[1], "customerID")?,
            item_id: parse_opt(fields[2], "itemID")?,
            item_name: (!fields[3].is_empty()).then(|| fields[3].to_string()),
            date: parse_opt(fields[4], "date")?,
            budget: parse_money(fields[5], "budget")?,
            old_item_id: parse_opt(fields[6], "oldItemID")?,
            old_item_price: parse_money(fields[7], "oldItemPrice")?,
            quantity: parse_field(fields[8], "quantity")?,
        })
    }

    /// Parses a received datagram.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::decode(std::str::from_utf8(bytes).map_err(|_| WireError::NotUtf8)?)
    }
}

/// One entry of a FIND response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundItem {
    pub id: ItemId,
    pub name: String,
    pub quantity: u32,
    pub price: Money,
}

impl FoundItem {
    fn render(&self) -> String {
        format!(
            "{}{ITEM_FIELD}{}{ITEM_FIELD}{}{ITEM_FIELD}{}",
            self.id,
            self.name,
            self.quantity,
            self.price.to_decimal()
        )
    }

    fn decode(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(ITEM_FIELD).collect();
        if parts.len() != 4 {
            return Err(WireError::FieldCount {
                expected: 4,
                found: parts.len(),
            });
        }
        Ok(Self {
            id: parse_field(parts[0], "items.id")?,
            name: parts[1].to_string(),
            quantity: parse_field(parts[2], "items.quantity")?,
            price: parse_money(parts[3], "items.price")?,
        })
    }
}

impl fmt::Display for FoundItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.id,
            self.name,
            self.quantity,
            self.price.to_decimal()
        )
    }
}

/// A peer's answer to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub success: bool,
    pub message: String,
    pub error_code: Option<String>,
    pub new_budget: Money,
    pub transaction_id: Option<TransactionId>,
    pub item_price: Money,
    pub items: Vec<FoundItem>,
}

impl Response {
    /// A successful response carrying `message`.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_code: None,
            new_budget: Money::zero(),
            transaction_id: None,
            item_price: Money::zero(),
            items: Vec::new(),
        }
    }

    /// A negative response with a machine-readable code.
    pub fn failure(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            error_code: Some(code.into()),
            ..Self::ok(message)
        }
    }

    pub fn with_budget(mut self, budget: Money) -> Self {
        self.new_budget = budget;
        self
    }

    pub fn with_transaction(mut self, id: TransactionId) -> Self {
        self.transaction_id = Some(id);
        self
    }

    pub fn with_item_price(mut self, price: Money) -> Self {
        self.item_price = price;
        self
    }

    pub fn with_items(mut self, items: Vec<FoundItem>) -> Self {
        self.items = items;
        self
    }

    /// Renders the record, rejecting text that would corrupt it.
    pub fn encode(&self) -> Result<String> {
        if self.message.contains([FIELD, '\n', '\r']) {
            return Err(WireError::Delimiter { field: "message" });
        }
        if let Some(code) = &self.error_code
            && code.contains([FIELD, '\n', '\r'])
        {
            return Err(WireError::Delimiter { field: "errorCode" });
        }
        if self
            .items
            .iter()
            .any(|item| item.name.contains([FIELD, ITEM_FIELD, ITEM_RECORD]))
        {
            return Err(WireError::Delimiter { field: "items" });
        }
        check_len(self.render())
    }

    /// Renders without validation. Only for responses built from fixed text.
    pub(crate) fn render(&self) -> String {
        let items: Vec<String> = self.items.iter().map(FoundItem::render).collect();
        [
            self.success.to_string(),
            self.message.clone(),
            self.error_code.clone().unwrap_or_default(),
            self.new_budget.to_decimal(),
            opt(&self.transaction_id),
            self.item_price.to_decimal(),
            items.join(";"),
        ]
        .join("|")
    }

    /// Parses a record. The trailing items field may be omitted.
    pub fn decode(raw: &str) -> Result<Self> {
        let fields: Vec<&str> = raw.split(FIELD).collect();
        if fields.len() != RESPONSE_FIELDS && fields.len() != RESPONSE_FIELDS - 1 {
            return Err(WireError::FieldCount {
                expected: RESPONSE_FIELDS,
                found: fields.len(),
            });
        }
        let success = match fields[0] {
            "true" => true,
            "false" => false,
            other => {
                return Err(WireError::InvalidField {
                    field: "success",
                    reason: other.to_string(),
                });
            }
        };
        let items = match fields.get(6) {
            Some(raw) if !raw.is_empty() => raw
                .split(ITEM_RECORD)
                .map(FoundItem::decode)
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };
        Ok(Self {
            success,
            message: fields[1].to_string(),
            error_code: (!fields[2].is_empty()).then(|| fields[2].to_string()),
            new_budget: parse_money(fields[3], "newBudget")?,
            transaction_id: parse_opt(fields[4], "transactionID")?,
            item_price: parse_money(fields[5], "itemPrice")?,
            items,
        })
    }

    /// Parses a received datagram.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::decode(std::str::from_utf8(bytes).map_err(|_| WireError::NotUtf8)?)
    }
}

fn check_len(encoded: String) -> Result<String> {
    if encoded.len() > MAX_DATAGRAM_LEN {
        return Err(WireError::Oversized {
            len: encoded.len(),
            max: MAX_DATAGRAM_LEN,
        });
    }
    Ok(encoded)
}

fn opt<T: fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn parse_field<T>(raw: &str, field: &'static str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse().map_err(|e: T::Err| WireError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

fn parse_opt<T>(raw: &str, field: &'static str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if raw.is_empty() {
        return Ok(None);
    }
    parse_field(raw, field).map(Some)
}

fn parse_money(raw: &str, field: &'static str) -> Result<Money> {
    if raw.is_empty() {
        return Ok(Money::zero());
    }
    parse_field(raw, field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> CustomerId {
        CustomerId::new("ONU2222").unwrap()
    }

    fn item(s: &str) -> ItemId {
        ItemId::new(s).unwrap()
    }

    #[test]
    fn test_purchase_request_layout() {
        let request = Request::purchase(
            customer(),
            item("QC1001"),
            TradeDate::parse("15012025").unwrap(),
            Money::from_dollars(1000),
            2,
        );
        let encoded = request.encode().unwrap();
        assert_eq!(encoded, "PURCHASE|ONU2222|QC1001||15012025|1000.00||0.00|2");
        assert_eq!(Request::decode(&encoded).unwrap(), request);
    }

    #[test]
    fn test_every_operation_round_trips() {
        let requests = [
            Request::purchase(
                customer(),
                item("QC1001"),
                TradeDate::parse("01012025").unwrap(),
                Money::from_cents(98802),
                1,
            ),
            Request::find(customer(), "coffee"),
            Request::exchange_check(
                customer(),
                item("BC1002"),
                Money::from_dollars(1000),
                item("QC1001"),
                Money::from_cents(599),
            ),
            Request::exchange_prepare(
                customer(),
                item("BC1002"),
                Money::from_dollars(1000),
                item("QC1001"),
                Money::from_cents(599),
            ),
            Request::exchange_commit(
                customer(),
                item("BC1002"),
                Money::from_dollars(1000),
                item("QC1001"),
                Money::from_cents(599),
            ),
            Request::exchange_rollback(customer(), item("BC1002"), item("QC1001")),
            Request::exchange_return(customer(), item("QC1001")),
            Request::exchange_undo_return(customer(), item("QC1001")),
        ];
        for request in requests {
            let decoded = Request::decode(&request.encode().unwrap()).unwrap();
            assert_eq!(decoded, request, "{}", request.operation);
        }
    }

    #[test]
    fn test_response_with_items_round_trips() {
        let response = Response::ok("Found 2 items").with_items(vec![
            FoundItem {
                id: item("ON1001"),
                name: "Coffee".into(),
                quantity: 4,
                price: Money::from_cents(599),
            },
            FoundItem {
                id: item("BC1001"),
                name: "Coffee".into(),
                quantity: 9,
                price: Money::from_cents(649),
            },
        ]);
        let encoded = response.encode().unwrap();
        assert_eq!(
            encoded,
            "true|Found 2 items||0.00||0.00|ON1001,Coffee,4,5.99;BC1001,Coffee,9,6.49"
        );
        assert_eq!(Response::decode(&encoded).unwrap(), response);
    }

    #[test]
    fn test_failure_and_transaction_round_trip() {
        let failure = Response::failure("Item is out of stock", "OUT_OF_STOCK");
        assert_eq!(Response::decode(&failure.encode().unwrap()).unwrap(), failure);

        let prepared = Response::ok("Reserved")
            .with_transaction(TransactionId::new())
            .with_budget(Money::from_cents(99_400))
            .with_item_price(Money::from_cents(1198));
        assert_eq!(Response::decode(&prepared.encode().unwrap()).unwrap(), prepared);
    }

    #[test]
    fn test_response_without_items_field_is_accepted() {
        let decoded = Response::decode("true|Return processed||0.00||0.00").unwrap();
        assert!(decoded.success);
        assert!(decoded.items.is_empty());
    }

    #[test]
    fn test_delimiters_in_text_are_rejected() {
        let request = Request::find(customer(), "co|ffee");
        assert_eq!(
            request.encode(),
            Err(WireError::Delimiter { field: "itemName" })
        );
        let response = Response::ok("a|b");
        assert_eq!(
            response.encode(),
            Err(WireError::Delimiter { field: "message" })
        );
        let listing = Response::ok("Found").with_items(vec![FoundItem {
            id: item("QC1001"),
            name: "Tea, green".into(),
            quantity: 1,
            price: Money::from_cents(100),
        }]);
        assert_eq!(
            listing.encode(),
            Err(WireError::Delimiter { field: "items" })
        );
    }

    #[test]
    fn test_oversized_record_is_rejected() {
        let request = Request::find(customer(), "x".repeat(MAX_DATAGRAM_LEN));
        assert!(matches!(request.encode(), Err(WireError::Oversized { .. })));
    }

    #[test]
    fn test_malformed_records() {
        assert!(matches!(
            Request::decode("PURCHASE|ONU2222"),
            Err(WireError::FieldCount { expected: 9, found: 2 })
        ));
        assert_eq!(
            Request::decode("SELL|||||0.00||0.00|0"),
            Err(WireError::UnknownOperation("SELL".into()))
        );
        assert!(matches!(
            Request::decode("PURCHASE|ONU2222|QC1001||15012025|lots||0.00|1"),
            Err(WireError::InvalidField { field: "budget", .. })
        ));
        assert!(matches!(
            Response::decode("maybe|x||0.00||0.00|"),
            Err(WireError::InvalidField { field: "success", .. })
        ));
        assert_eq!(Request::from_bytes(&[0xff, 0xfe]), Err(WireError::NotUtf8));
    }

    #[test]
    fn test_empty_amounts_decode_as_zero() {
        let decoded = Request::decode("FIND|ONU2222||tea|||||0").unwrap();
        assert_eq!(decoded.budget, Money::zero());
        assert_eq!(decoded.old_item_price, Money::zero());
        assert_eq!(decoded.item_name.as_deref(), Some("tea"));
        assert_eq!(decoded.quantity, 0);
    }

    #[test]
    fn test_empty_item_name_reads_back_as_absent() {
        let customer = CustomerId::new("ONU2222").unwrap();
        let empty = Request::find(customer.clone(), "");
        let mut absent = Request::find(customer, "");
        absent.item_name = None;

        let encoded = empty.encode().unwrap();
        assert_eq!(encoded, absent.encode().unwrap());
        assert_eq!(Request::decode(&encoded).unwrap(), absent);
    }
}
