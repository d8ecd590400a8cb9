use ethers::prelude::abigen;

// JSON ABI (with `internalType` annotations) rather than the human-readable
// form: ethers 2.0's human-readable parser drops `internalType` on outputs,
// so `returns (NftItem[])` would degrade to raw tuples instead of the
// declared struct.
abigen!(
    NftMarket,
    r#"[
        {
            "anonymous": false,
            "inputs": [
                { "indexed": false, "internalType": "uint256", "name": "tokenId", "type": "uint256" },
                { "indexed": false, "internalType": "uint256", "name": "price", "type": "uint256" },
                { "indexed": false, "internalType": "address", "name": "creator", "type": "address" },
                { "indexed": false, "internalType": "bool", "name": "isListed", "type": "bool" }
            ],
            "name": "NftItemCreated",
            "type": "event"
        },
        {
            "anonymous": false,
            "inputs": [
                { "indexed": true, "internalType": "address", "name": "from", "type": "address" },
                { "indexed": true, "internalType": "address", "name": "to", "type": "address" },
                { "indexed": true, "internalType": "uint256", "name": "tokenId", "type": "uint256" }
            ],
            "name": "Transfer",
            "type": "event"
        },
        {
            "inputs": [],
            "name": "name",
            "outputs": [{ "internalType": "string", "name": "", "type": "string" }],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "symbol",
            "outputs": [{ "internalType": "string", "name": "", "type": "string" }],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "listingPrice",
            "outputs": [{ "internalType": "uint256", "name": "", "type": "uint256" }],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [{ "internalType": "uint256", "name": "newPrice", "type": "uint256" }],
            "name": "setListingPrice",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [
                { "internalType": "string", "name": "tokenURI", "type": "string" },
                { "internalType": "uint256", "name": "price", "type": "uint256" }
            ],
            "name": "mintToken",
            "outputs": [{ "internalType": "uint256", "name": "", "type": "uint256" }],
            "stateMutability": "payable",
            "type": "function"
        },
        {
            "inputs": [{ "internalType": "uint256", "name": "tokenId", "type": "uint256" }],
            "name": "burnToken",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [{ "internalType": "uint256", "name": "tokenId", "type": "uint256" }],
            "name": "buyNft",
            "outputs": [],
            "stateMutability": "payable",
            "type": "function"
        },
        {
            "inputs": [
                { "internalType": "uint256", "name": "tokenId", "type": "uint256" },
                { "internalType": "uint256", "name": "newPrice", "type": "uint256" }
            ],
            "name": "placeNftOnSale",
            "outputs": [],
            "stateMutability": "payable",
            "type": "function"
        },
        {
            "inputs": [{ "internalType": "uint256", "name": "tokenId", "type": "uint256" }],
            "name": "getNftItem",
            "outputs": [
                {
                    "components": [
                        { "internalType": "uint256", "name": "tokenId", "type": "uint256" },
                        { "internalType": "uint256", "name": "price", "type": "uint256" },
                        { "internalType": "address", "name": "creator", "type": "address" },
                        { "internalType": "bool", "name": "isListed", "type": "bool" }
                    ],
                    "internalType": "struct NftMarket.NftItem",
                    "name": "",
                    "type": "tuple"
                }
            ],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "getAllNftsOnSale",
            "outputs": [
                {
                    "components": [
                        { "internalType": "uint256", "name": "tokenId", "type": "uint256" },
                        { "internalType": "uint256", "name": "price", "type": "uint256" },
                        { "internalType": "address", "name": "creator", "type": "address" },
                        { "internalType": "bool", "name": "isListed", "type": "bool" }
                    ],
                    "internalType": "struct NftMarket.NftItem[]",
                    "name": "",
                    "type": "tuple[]"
                }
            ],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "getOwnedNfts",
            "outputs": [
                {
                    "components": [
                        { "internalType": "uint256", "name": "tokenId", "type": "uint256" },
                        { "internalType": "uint256", "name": "price", "type": "uint256" },
                        { "internalType": "address", "name": "creator", "type": "address" },
                        { "internalType": "bool", "name": "isListed", "type": "bool" }
                    ],
                    "internalType": "struct NftMarket.NftItem[]",
                    "name": "",
                    "type": "tuple[]"
                }
            ],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "listedItemsCount",
            "outputs": [{ "internalType": "uint256", "name": "", "type": "uint256" }],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [{ "internalType": "string", "name": "tokenURI", "type": "string" }],
            "name": "tokenURIExists",
            "outputs": [{ "internalType": "bool", "name": "", "type": "bool" }],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [{ "internalType": "uint256", "name": "tokenId", "type": "uint256" }],
            "name": "tokenURI",
            "outputs": [{ "internalType": "string", "name": "", "type": "string" }],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "totalSupply",
            "outputs": [{ "internalType": "uint256", "name": "", "type": "uint256" }],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [{ "internalType": "uint256", "name": "index", "type": "uint256" }],
            "name": "tokenByIndex",
            "outputs": [{ "internalType": "uint256", "name": "", "type": "uint256" }],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [
                { "internalType": "address", "name": "owner", "type": "address" },
                { "internalType": "uint256", "name": "index", "type": "uint256" }
            ],
            "name": "tokenOfOwnerByIndex",
            "outputs": [{ "internalType": "uint256", "name": "", "type": "uint256" }],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [{ "internalType": "uint256", "name": "tokenId", "type": "uint256" }],
            "name": "ownerOf",
            "outputs": [{ "internalType": "address", "name": "", "type": "address" }],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [{ "internalType": "address", "name": "owner", "type": "address" }],
            "name": "balanceOf",
            "outputs": [{ "internalType": "uint256", "name": "", "type": "uint256" }],
            "stateMutability": "view",
            "type": "function"
        }
    ]"#
);
