//! Contract interfaces for outbound reads
//!
//! The view functions the projection calls, declared with `sol!`. Calldata
//! comes from the generated call types and return data is decoded with
//! `abi_decode_returns` in validating mode, so truncated data, bad offsets
//! and dirty padding are errors rather than panics.

use alloy_primitives::B256;
use alloy_sol_types::{sol, SolCall};
use anyhow::{Context, Result};

sol! {
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
    }

    // Pre-standard tokens answer the metadata calls with a bytes32
    interface IERC20Bytes32 {
        function name() external view returns (bytes32);
    }

    interface ITrust {
        function getContracts() external view returns (
            address reserve,
            address redeemable,
            address seeder,
            address tier,
            address crp
        );
        function getDistributionProgress() external view returns (
            uint8 distributionStatus,
            uint32 distributionStartBlock,
            uint32 distributionEndBlock,
            uint256 poolReserveBalance,
            uint256 poolTokenBalance,
            uint256 reserveInit,
            uint256 minimumCreatorRaise,
            uint256 seederFee,
            uint256 redeemInit
        );
        function minimumTradingDuration() external view returns (uint256);
        function finalWeight() external view returns (uint256);
        function finalValuation() external view returns (uint256);
    }

    interface ISale {
        function saleStatus() external view returns (uint8);
    }

    interface ITier {
        function tierValues() external view returns (uint256[8]);
    }

    interface ISeedERC20 {
        function reserve() external view returns (address);
    }
}

/// Decode the return data of call `C`.
pub fn returns<C: SolCall>(data: &[u8]) -> Result<C::Return> {
    C::abi_decode_returns(data, true)
        .with_context(|| format!("Malformed {} return data ({} bytes)", C::SIGNATURE, data.len()))
}

/// Decode a `string` metadata return (`name()` and `symbol()` share the
/// shape).
///
/// A bare 32-byte return is read as a NUL-padded `bytes32` string.
pub fn decode_string(data: &[u8]) -> Result<String> {
    match returns::<IERC20::nameCall>(data) {
        Ok(ret) => Ok(ret._0),
        Err(err) if data.len() == 32 => {
            let word: B256 = returns::<IERC20Bytes32::nameCall>(data).map_err(|_| err)?._0;
            let end = word.iter().position(|b| *b == 0).unwrap_or(word.len());
            String::from_utf8(word[..end].to_vec()).context("bytes32 string is not UTF-8")
        }
        Err(err) => Err(err),
    }
}
