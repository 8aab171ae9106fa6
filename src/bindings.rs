//! Solidity interfaces of the Raffle and the VRF coordinator mock.
//!
//! Both the in-process chain and the RPC client encode calls, events and
//! custom errors through these bindings, so the two networks speak the same
//! ABI.

use alloy_sol_types::sol;

sol! {
    #[sol(abi)]
    #[derive(Debug, PartialEq, Eq)]
    interface IRaffle {
        event RaffleEnter(address indexed player);
        event RequestedRaffleWinner(uint256 indexed requestId);
        event WinnerPicked(address indexed winner);

        error Raffle__NotEnoughETHEntered();
        error Raffle__TransferFailed();
        error Raffle__NotOpen();
        error Raffle__UpkeepNotNeeded(uint256 currentBalance, uint256 numPlayers, uint256 raffleState);
        error OnlyCoordinatorCanFulfill(address have, address want);

        function enterRaffle() external payable;
        function checkUpkeep(bytes memory checkData) external view returns (bool upkeepNeeded, bytes memory performData);
        function performUpkeep(bytes calldata performData) external;
        function rawFulfillRandomWords(uint256 requestId, uint256[] memory randomWords) external;

        function getRalleState() external view returns (uint8);
        function getNumWords() external pure returns (uint256);
        function getRequestConfirmations() external pure returns (uint256);
        function getRecentWinner() external view returns (address);
        function getPlayer(uint256 index) external view returns (address);
        function getLatestTimestamp() external view returns (uint256);
        function getInterval() external view returns (uint256);
        function getEntranceFee() external view returns (uint256);
        function getNumberOfPlayers() external view returns (uint256);
    }
}

sol! {
    #[sol(abi)]
    #[derive(Debug, PartialEq, Eq)]
    interface VRFCoordinatorV2Mock {
        event SubscriptionCreated(uint64 indexed subId, address owner);
        event SubscriptionFunded(uint64 indexed subId, uint256 oldBalance, uint256 newBalance);
        event RandomWordsRequested(
            bytes32 indexed keyHash,
            uint256 requestId,
            uint256 preSeed,
            uint64 indexed subId,
            uint16 minimumRequestConfirmations,
            uint32 callbackGasLimit,
            uint32 numWords,
            address indexed sender
        );
        event RandomWordsFulfilled(uint256 indexed requestId, uint256 outputSeed, uint96 payment, bool success);
        event ConsumerAdded(uint64 indexed subId, address consumer);

        error InvalidSubscription();
        error InsufficientBalance();
        error MustBeSubOwner(address owner);

        function createSubscription() external returns (uint64 subId);
        function fundSubscription(uint64 subId, uint96 amount) external;
        function addConsumer(uint64 subId, address consumer) external;
        function getSubscription(uint64 subId)
            external
            view
            returns (uint96 balance, uint64 reqCount, address owner, address[] memory consumers);
        function requestRandomWords(
            bytes32 keyHash,
            uint64 subId,
            uint16 minimumRequestConfirmations,
            uint32 callbackGasLimit,
            uint32 numWords
        ) external returns (uint256 requestId);
        function fulfillRandomWords(uint256 requestId, address consumer) external;
    }
}
