use ethers::prelude::abigen;

// Compound-v2 style market registry (Flux, Mendi and other forks)
abigen!(
    Comptroller,
    r#"[
        function getAllMarkets() external view returns (address[])
    ]"#
);
