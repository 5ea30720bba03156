use ethers::prelude::abigen;

// Batched balance reads: `balances` returns users.len() * tokens.len() entries,
// user-major (result[u * tokens.len() + t]).
abigen!(
    BalanceChecker,
    r#"[
        function balances(address[] users, address[] tokens) external view returns (uint256[])
    ]"#
);
