//! Command routing.
//!
//! Turns a function name plus positional string arguments into a typed
//! [`Command`]. The argument count is checked before any other validation.

use crate::ContractError;

/// A contract command with its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	PlaceProductOrder {
		product_id: String,
	},
	OrderProductPart {
		order_id: String,
		product_part_id: String,
	},
	ChangeProductOrderState {
		order_id: String,
		new_state: String,
		rejecter: String,
	},
	ChangeProductPartOrderState {
		order_id: String,
		part_order_id: String,
		new_state: String,
	},
	QueryAllProductOrders,
	QueryProductOrderHistory {
		order_id: String,
	},
}

impl Command {
	/// Names of every routable function.
	pub const FUNCTIONS: [&'static str; 6] = [
		"placeProductOrder",
		"orderProductPart",
		"changeProductOrderState",
		"changeProductPartOrderState",
		"queryAllProductOrders",
		"queryProductOrderHistory",
	];

	/// Resolves a function name and its arguments.
	pub fn parse(function: &str, args: &[String]) -> Result<Self, ContractError> {
		let expected = arity(function)?;
		if args.len() != expected {
			return Err(ContractError::ArgumentCountMismatch {
				function: function.to_string(),
				expected,
				actual: args.len(),
			});
		}

		let arg = |i: usize| args[i].clone();
		let command = match function {
			"placeProductOrder" => Command::PlaceProductOrder { product_id: arg(0) },
			"orderProductPart" => Command::OrderProductPart {
				order_id: arg(0),
				product_part_id: arg(1),
			},
			"changeProductOrderState" => Command::ChangeProductOrderState {
				order_id: arg(0),
				new_state: arg(1),
				rejecter: arg(2),
			},
			"changeProductPartOrderState" => Command::ChangeProductPartOrderState {
				order_id: arg(0),
				part_order_id: arg(1),
				new_state: arg(2),
			},
			"queryAllProductOrders" => Command::QueryAllProductOrders,
			"queryProductOrderHistory" => Command::QueryProductOrderHistory { order_id: arg(0) },
			_ => return Err(ContractError::UnknownFunction(function.to_string())),
		};
		Ok(command)
	}

	/// Function name this command was routed from.
	pub fn name(&self) -> &'static str {
		match self {
			Command::PlaceProductOrder { .. } => "placeProductOrder",
			Command::OrderProductPart { .. } => "orderProductPart",
			Command::ChangeProductOrderState { .. } => "changeProductOrderState",
			Command::ChangeProductPartOrderState { .. } => "changeProductPartOrderState",
			Command::QueryAllProductOrders => "queryAllProductOrders",
			Command::QueryProductOrderHistory { .. } => "queryProductOrderHistory",
		}
	}

	/// Whether the command only reads the ledger.
	pub fn is_query(&self) -> bool {
		matches!(
			self,
			Command::QueryAllProductOrders | Command::QueryProductOrderHistory { .. }
		)
	}
}

fn arity(function: &str) -> Result<usize, ContractError> {
	match function {
		"placeProductOrder" => Ok(1),
		"orderProductPart" => Ok(2),
		"changeProductOrderState" | "changeProductPartOrderState" => Ok(3),
		"queryAllProductOrders" => Ok(0),
		"queryProductOrderHistory" => Ok(1),
		_ => Err(ContractError::UnknownFunction(function.to_string())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn args(values: &[&str]) -> Vec<String> {
		values.iter().map(|v| v.to_string()).collect()
	}

	#[test]
	fn test_parse_commands() {
		assert_eq!(
			Command::parse("placeProductOrder", &args(&["p"])).unwrap(),
			Command::PlaceProductOrder {
				product_id: "p".to_string()
			}
		);
		assert_eq!(
			Command::parse("changeProductOrderState", &args(&["o", "REJECTED", ""])).unwrap(),
			Command::ChangeProductOrderState {
				order_id: "o".to_string(),
				new_state: "REJECTED".to_string(),
				rejecter: String::new(),
			}
		);
		assert_eq!(
			Command::parse("queryAllProductOrders", &[]).unwrap(),
			Command::QueryAllProductOrders
		);
	}

	#[test]
	fn test_every_function_routes_to_itself() {
		for function in Command::FUNCTIONS {
			let count = arity(function).unwrap();
			let command = Command::parse(function, &vec!["x".to_string(); count]).unwrap();
			assert_eq!(command.name(), function);
		}
	}

	#[test]
	fn test_argument_count_mismatch() {
		let err = Command::parse("orderProductPart", &args(&["only-one"])).unwrap_err();
		assert!(matches!(
			err,
			ContractError::ArgumentCountMismatch {
				expected: 2,
				actual: 1,
				..
			}
		));
		assert!(matches!(
			Command::parse("queryAllProductOrders", &args(&["extra"])),
			Err(ContractError::ArgumentCountMismatch { .. })
		));
		assert!(matches!(
			Command::parse("changeProductOrderState", &args(&["o", "BOGUS"])),
			Err(ContractError::ArgumentCountMismatch { .. })
		));
	}

	#[test]
	fn test_unknown_function() {
		assert!(matches!(
			Command::parse("deleteProductOrder", &args(&["o"])),
			Err(ContractError::UnknownFunction(name)) if name == "deleteProductOrder"
		));
	}

	#[test]
	fn test_query_commands() {
		assert!(Command::QueryAllProductOrders.is_query());
		assert!(!Command::parse("placeProductOrder", &args(&["p"]))
			.unwrap()
			.is_query());
	}
}
