use ethers::prelude::abigen;

// Flux fToken (cToken fork). Rates are 18-decimal fixed point per block.
abigen!(
    FToken,
    r#"[
        function underlying() external view returns (address)
        function exchangeRateStored() external view returns (uint256)
        function supplyRatePerBlock() external view returns (uint256)
        function totalSupply() external view returns (uint256)
    ]"#
);
